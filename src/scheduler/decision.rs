//! Whether and when a configuration should run
//!
//! | Configuration | Decision |
//! |---------------|----------|
//! | `cronEnabled` missing | `Invalid` |
//! | never processed | `RunNow` |
//! | cron on, elapsed > interval | `RunNow` |
//! | cron on, elapsed <= interval | `RunAfter(interval - elapsed)` |
//! | cron off, processed before | `Done` |

use crate::model::AggregatorConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleDecision {
    RunNow,
    RunAfter(Duration),
    /// Nothing to do until the next configuration notification
    Done,
    Invalid(String),
}

/// Evaluates `config` at `now`
pub fn evaluate(config: &AggregatorConfig, now: DateTime<Utc>) -> ScheduleDecision {
    let Some(cron_enabled) = config.cron_enabled else {
        return ScheduleDecision::Invalid("cronEnabled is missing".to_string());
    };

    let Some(last_processed_at) = config.last_processed_at else {
        return ScheduleDecision::RunNow;
    };

    if !cron_enabled {
        return ScheduleDecision::Done;
    }

    let interval_hours = match cron_interval_hours(config) {
        Ok(hours) => hours,
        Err(reason) => return ScheduleDecision::Invalid(reason),
    };

    // A timestamp from the future counts as just processed
    let elapsed_hours =
        ((now - last_processed_at).num_milliseconds() as f64 / MILLIS_PER_HOUR).max(0.0);

    if elapsed_hours > interval_hours {
        ScheduleDecision::RunNow
    } else {
        ScheduleDecision::RunAfter(hours_to_duration(interval_hours - elapsed_hours))
    }
}

/// Delay before retrying a failed cycle: the cron interval, if cron is on
pub fn retry_delay(config: &AggregatorConfig) -> Option<Duration> {
    if config.cron_enabled != Some(true) {
        return None;
    }
    cron_interval_hours(config).ok().map(hours_to_duration)
}

fn cron_interval_hours(config: &AggregatorConfig) -> Result<f64, String> {
    match config.cron_interval_hours {
        None => Err("cronIntervalHours is missing".to_string()),
        Some(hours) if !hours.is_finite() || hours < 0.0 => {
            Err(format!("cronIntervalHours must be a non-negative number, got {}", hours))
        }
        Some(hours) => Ok(hours),
    }
}

fn hours_to_duration(hours: f64) -> Duration {
    Duration::from_millis((hours * MILLIS_PER_HOUR).round() as u64)
}
