//! Data model shared by crawlers, aggregator and scheduler
//!
//! - `MediaItem`: one aggregated item with its images and stream URLs
//! - `AggregatorConfig`: the remote run configuration and its entries

mod aggregator_config;
mod media;

pub use aggregator_config::{AggregatorConfig, SourceConfigEntry, SourceCriterion};
pub use media::{Image, MediaItem, Stream, StreamType};
