//! Per-cycle counters

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Summary of one aggregation cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Name of the configuration that drove the cycle
    pub config_name: String,

    pub started_at: DateTime<Utc>,

    /// Set once the batch is published and the timestamp recorded
    pub finished_at: Option<DateTime<Utc>>,

    /// Entries that ran a crawler
    pub entries_run: usize,

    /// Items returned by all crawlers, duplicates included
    pub items_collected: usize,

    /// Items left after deduplication by id
    pub items_unique: usize,

    /// URLs removed as unwanted stream types
    pub urls_removed: usize,

    /// Segment URLs appended by manifest resolution
    pub segments_added: usize,

    /// Blank URLs pruned before publishing
    pub urls_pruned: usize,

    pub items_published: usize,
}

impl CycleReport {
    pub fn new(config_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            config_name: config_name.into(),
            started_at,
            finished_at: None,
            entries_run: 0,
            items_collected: 0,
            items_unique: 0,
            urls_removed: 0,
            segments_added: 0,
            urls_pruned: 0,
            items_published: 0,
        }
    }

    /// Wall-clock duration, if the cycle finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Number of duplicate items dropped
    pub fn duplicates(&self) -> usize {
        self.items_collected.saturating_sub(self.items_unique)
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle '{}': {} entries, {} items collected ({} duplicates), {} URLs removed, {} segments added, {} blank URLs pruned, {} items published",
            self.config_name,
            self.entries_run,
            self.items_collected,
            self.duplicates(),
            self.urls_removed,
            self.segments_added,
            self.urls_pruned,
            self.items_published
        )?;
        if let Some(seconds) = self.duration_seconds() {
            write!(f, " in {}s", seconds)?;
        }
        Ok(())
    }
}
