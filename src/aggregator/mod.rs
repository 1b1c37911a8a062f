//! Aggregation cycle
//!
//! One cycle runs every configuration entry against its crawler, then:
//! 1. Merges the results and drops duplicate ids (first wins)
//! 2. Removes URLs of unwanted stream types
//! 3. Classifies the remaining URLs into `streams`
//! 4. Resolves HLS manifests into segment URLs
//! 5. Prunes blank URLs
//! 6. Publishes the batch and records the completion time
//!
//! A failing entry contributes nothing. A cancellation aborts the cycle
//! before anything is published, and a cancellation during the publish
//! skips recording the completion time.

pub mod classify;
mod stats;

pub use stats::CycleReport;

use crate::config::ServiceConfig;
use crate::crawler::{HomeCrawlSettings, HomeCrawler, PublicationsCrawler};
use crate::fetch::{CancelGroup, FetchOptions, Fetcher};
use crate::manifest::ManifestResolver;
use crate::model::{AggregatorConfig, MediaItem, SourceConfigEntry, SourceCriterion};
use crate::sink::{Sink, SnapshotWriter};
use crate::{AggregatorError, Result};
use chrono::Utc;
use classify::{classify_streams, dedupe_by_id, prune_stream_urls, remove_unwanted_urls};
use futures::future::try_join_all;
use std::sync::Arc;

pub struct Aggregator {
    publications: PublicationsCrawler,
    home: HomeCrawler,
    resolver: ManifestResolver,
    sink: Arc<dyn Sink>,
}

impl Aggregator {
    pub fn new(
        publications: PublicationsCrawler,
        home: HomeCrawler,
        resolver: ManifestResolver,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            publications,
            home,
            resolver,
            sink,
        }
    }

    /// Wires both crawlers and the resolver from the service configuration
    pub fn from_config(config: &ServiceConfig, fetcher: Fetcher, sink: Arc<dyn Sink>) -> Self {
        let timeout = config.crawler.detail_timeout();

        let mut publications =
            PublicationsCrawler::new(fetcher.clone(), &config.sources.latest_url)
                .with_timeout(timeout);
        if let Some(path) = &config.output.snapshot_path {
            publications = publications.with_snapshot(SnapshotWriter::new(path));
        }

        let home = HomeCrawler::new(
            fetcher.clone(),
            &config.sources.home_url,
            HomeCrawlSettings::from(&config.crawler),
        );
        let resolver = ManifestResolver::new(
            fetcher,
            &config.crawler.manifest_scheme,
            FetchOptions::with_timeout(timeout),
        );

        Self::new(publications, home, resolver, sink)
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Runs one full cycle for `config` under `group`
    ///
    /// # Returns
    ///
    /// * `Ok(CycleReport)` - The batch was published and the time recorded
    /// * `Err(AggregatorError)` - Cancelled, or the sink rejected the batch
    pub async fn run_cycle(
        &self,
        group: &CancelGroup,
        config: &AggregatorConfig,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::new(&config.name, Utc::now());
        tracing::info!(
            "Starting cycle '{}' with {} entries (generation {})",
            config.name,
            config.entries.len(),
            group.generation()
        );

        let batches = try_join_all(
            config
                .entries
                .iter()
                .map(|entry| self.run_entry(group, entry)),
        )
        .await?;

        report.entries_run = config
            .entries
            .iter()
            .filter(|entry| entry.criterion != SourceCriterion::Unsupported)
            .count();
        let collected: Vec<MediaItem> = batches.into_iter().flatten().collect();
        report.items_collected = collected.len();

        let mut items = dedupe_by_id(collected);
        report.items_unique = items.len();
        tracing::info!(
            "Collected {} items, {} after deduplication",
            report.items_collected,
            report.items_unique
        );

        for item in &mut items {
            report.urls_removed += remove_unwanted_urls(item);
            classify_streams(item);
        }

        let added = try_join_all(
            items
                .iter_mut()
                .map(|item| self.resolver.resolve(group, item)),
        )
        .await?;
        report.segments_added = added.iter().sum();

        for item in &mut items {
            report.urls_pruned += prune_stream_urls(item);
        }

        if group.is_cancelled() {
            return Err(AggregatorError::Cancelled);
        }

        self.sink.publish(&items).await?;
        report.items_published = items.len();

        // Superseded while publishing; the newer generation owns the bookkeeping
        if group.is_cancelled() {
            tracing::info!(
                "Cycle '{}' superseded after publishing, not recording completion",
                config.name
            );
            return Err(AggregatorError::Cancelled);
        }

        let finished_at = Utc::now();
        self.sink
            .record_last_processed(&config.name, finished_at)
            .await?;
        report.finished_at = Some(finished_at);

        tracing::info!("{}", report);
        Ok(report)
    }

    async fn run_entry(
        &self,
        group: &CancelGroup,
        entry: &SourceConfigEntry,
    ) -> Result<Vec<MediaItem>> {
        let result = match entry.criterion {
            SourceCriterion::LatestPublications => {
                self.publications.get_latest(group, entry.value).await
            }
            SourceCriterion::HomePageTeasers => self.home.get_from_home(group, entry.value).await,
            SourceCriterion::Unsupported => {
                tracing::warn!("Skipping entry with unsupported criterion");
                return Ok(Vec::new());
            }
        };

        match result {
            Ok(items) => {
                tracing::info!(
                    "Entry {} ({}) returned {} items",
                    entry.criterion,
                    entry.value,
                    items.len()
                );
                Ok(items)
            }
            Err(e) if e.is_cancelled() => Err(AggregatorError::Cancelled),
            Err(e) => {
                tracing::error!("Entry {} ({}) failed: {}", entry.criterion, entry.value, e);
                Ok(Vec::new())
            }
        }
    }
}
