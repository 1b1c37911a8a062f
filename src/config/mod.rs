//! Service configuration
//!
//! This module handles loading, parsing, and validating the TOML file that
//! tells the service where its upstream sources and downstream sink live.
//! The per-run aggregator configuration is fetched from the sink instead and
//! lives in [`crate::model`].
//!
//! # Example
//!
//! ```no_run
//! use stream_aggregator::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("aggregator.toml")).unwrap();
//! println!("Sink: {}", config.sink.base_url);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CrawlerConfig, NotifierConfig, OutputConfig, ServiceConfig, SinkConfig, SourcesConfig,
    UserAgentConfig,
};

pub use parser::{load_config, parse_config};
