//! Scheduling of aggregation cycles
//!
//! - `decision`: pure evaluation of a configuration at a point in time
//! - `service`: the state machine owning the single pending timer

mod decision;
mod service;

pub use decision::{evaluate, retry_delay, ScheduleDecision};
pub use service::{Phase, Scheduler};
