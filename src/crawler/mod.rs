//! Upstream crawlers
//!
//! This module contains the two discovery strategies:
//! - Bulk pagination over the "latest publications" listing
//! - Breadth-first expansion from the widget-based home page
//!
//! Both fetch through the shared [`Fetcher`](crate::fetch::Fetcher) under the
//! cancellation group of the current cycle.

pub mod home_models;
pub mod publication_models;

mod home;
mod pool;
mod publications;

pub use home::{HomeCrawlSettings, HomeCrawler};
pub use home_models::{CrawlReference, DetailOutcome};
pub use pool::{fetch_bounded, PoolOutcome};
pub use publications::PublicationsCrawler;
