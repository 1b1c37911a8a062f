//! Downstream sink: configuration source and publish target
//!
//! The sink owns all durable state. The aggregator reads its configuration
//! from it, publishes each cycle's batch to it and records when a cycle
//! finished.

mod http;
mod snapshot;
mod traits;

pub use http::HttpSink;
pub use snapshot::SnapshotWriter;
pub use traits::{Sink, SinkError, SinkResult};
