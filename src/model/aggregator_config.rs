//! Aggregator configuration as served by the state API
//!
//! Field names follow the state API; the legacy names it used to emit
//! (`cronJobActive`, `cronJobInterval`, `lastProcessed`, `configItems`) are
//! accepted as aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One run configuration, fetched fresh before every scheduling decision
///
/// The scheduling fields are optional at the wire level so that a
/// configuration missing them can be reported as invalid instead of
/// failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorConfig {
    pub name: String,
    #[serde(default, alias = "cronJobActive")]
    pub cron_enabled: Option<bool>,
    #[serde(default, alias = "cronJobInterval")]
    pub cron_interval_hours: Option<f64>,
    #[serde(
        default,
        alias = "lastProcessed",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_processed_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "configItems")]
    pub entries: Vec<SourceConfigEntry>,
}

/// One crawl request: which crawler and how many items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfigEntry {
    pub criterion: SourceCriterion,
    pub value: usize,
}

/// Strategy selecting the crawler for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceCriterion {
    /// Paginated "latest publications" listing
    #[serde(rename = "latest-publications", alias = "latest")]
    LatestPublications,

    /// Breadth-first crawl starting at the home page teasers
    #[serde(rename = "home-page-teasers", alias = "ard-mediathek-home")]
    HomePageTeasers,

    /// Any criterion this service does not know; contributes nothing
    #[serde(other)]
    Unsupported,
}

impl fmt::Display for SourceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LatestPublications => "latest-publications",
            Self::HomePageTeasers => "home-page-teasers",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}
