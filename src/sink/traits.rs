//! Sink trait interface and error types

use crate::model::{AggregatorConfig, MediaItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while talking to the sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid sink URL: {0}")]
    Url(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Downstream state API
///
/// Implementations must be shareable across the scheduler's driver tasks.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Loads the aggregator configuration published at `config_url`
    async fn fetch_config(&self, config_url: &str) -> SinkResult<AggregatorConfig>;

    /// Replaces the downstream state with `items`
    async fn publish(&self, items: &[MediaItem]) -> SinkResult<()>;

    /// Records the completion time of a cycle for the named configuration
    async fn record_last_processed(&self, name: &str, at: DateTime<Utc>) -> SinkResult<()>;
}
