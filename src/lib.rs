//! Stream Aggregator: playable media metadata from two upstream sources
//!
//! This crate crawls a paginated "latest publications" API and a widget-based
//! home page API, merges and deduplicates the results, resolves HLS manifests
//! into segment URLs and republishes one batch to a downstream sink on a
//! recurring schedule.

pub mod aggregator;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod manifest;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod sink;
pub mod url;

use thiserror::Error;

/// Main error type for aggregation operations
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] notify::NotifierError),

    #[error("Cycle cancelled")]
    Cancelled,

    #[error("Invalid aggregator configuration: {0}")]
    InvalidSchedule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AggregatorError {
    /// Returns true if this error was caused by an explicit cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Fetch(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for aggregation operations
pub type Result<T> = std::result::Result<T, AggregatorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use aggregator::{Aggregator, CycleReport};
pub use config::ServiceConfig;
pub use fetch::{CancelGroup, CancellationRegistry, FetchError, Fetcher};
pub use model::{AggregatorConfig, MediaItem, SourceConfigEntry, SourceCriterion, StreamType};
pub use scheduler::{ScheduleDecision, Scheduler};
