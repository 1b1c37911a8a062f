//! Breadth-first crawler over the widget-based home page
//!
//! Round 1 visits the teasers of the home page. Every fetched page either
//! yields one terminal item or contributes references to the next round.
//! The crawl stops as soon as enough items with stream data are collected,
//! when no unvisited reference is left, or after the round cap.

use crate::config::CrawlerConfig;
use crate::crawler::home_models::{CrawlReference, DetailOutcome, Page};
use crate::crawler::pool::fetch_bounded;
use crate::fetch::{CancelGroup, FetchError, FetchOptions, Fetcher};
use crate::model::MediaItem;
use crate::url::reference_key;
use std::collections::HashSet;
use std::time::Duration;

/// Tuning knobs of the breadth-first crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeCrawlSettings {
    pub max_concurrent: usize,
    pub timeout_retries: u32,
    pub timeout: Duration,
    pub max_rounds: u32,
}

impl Default for HomeCrawlSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for HomeCrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_fetches,
            timeout_retries: config.timeout_retries,
            timeout: config.detail_timeout(),
            max_rounds: config.max_rounds,
        }
    }
}

pub struct HomeCrawler {
    fetcher: Fetcher,
    home_url: String,
    settings: HomeCrawlSettings,
}

/// Per-round counters, logged after each round
#[derive(Debug, Default)]
struct RoundStats {
    fetched: usize,
    dropped: usize,
    new_items: usize,
    references: usize,
    adult: usize,
    empty: usize,
}

impl HomeCrawler {
    pub fn new(fetcher: Fetcher, home_url: impl Into<String>, settings: HomeCrawlSettings) -> Self {
        Self {
            fetcher,
            home_url: home_url.into(),
            settings,
        }
    }

    /// Collects up to `target` items with stream data reachable from the
    /// home page
    ///
    /// `target == 0` returns immediately without any request. Failing
    /// detail fetches are dropped; only a cancellation, or a failure of the
    /// home page itself, is returned as an error.
    pub async fn get_from_home(
        &self,
        group: &CancelGroup,
        target: usize,
    ) -> Result<Vec<MediaItem>, FetchError> {
        if target == 0 {
            return Ok(Vec::new());
        }

        tracing::info!(">>> Start: searching {} items from the home page", target);
        let options = FetchOptions::with_timeout(self.settings.timeout);
        let home: Page = self
            .fetcher
            .fetch_json(group, &self.home_url, options)
            .await?;

        let mut frontier = home.references();
        let mut visited: HashSet<String> = HashSet::from([reference_key(&self.home_url)]);
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut items: Vec<MediaItem> = Vec::new();
        let mut round = 0u32;

        loop {
            let batch = unvisited(frontier, &mut visited);
            if batch.is_empty() {
                tracing::info!("No unvisited references left after {} rounds", round);
                break;
            }
            if round >= self.settings.max_rounds {
                tracing::warn!(
                    "Round cap {} reached with {}/{} items, {} references left unvisited",
                    self.settings.max_rounds,
                    items.len(),
                    target,
                    batch.len()
                );
                break;
            }
            round += 1;

            tracing::debug!("Round {}: fetching {} pages", round, batch.len());
            let fetcher = &self.fetcher;
            let outcome = fetch_bounded(
                batch,
                self.settings.max_concurrent,
                self.settings.timeout_retries,
                |reference: CrawlReference| async move {
                    fetcher.fetch_json::<Page>(group, &reference.href, options).await
                },
            )
            .await?;

            let mut stats = RoundStats {
                fetched: outcome.fetched.len(),
                dropped: outcome.dropped.len(),
                ..RoundStats::default()
            };
            let mut next = Vec::new();

            for (reference, page) in outcome.fetched {
                match page.scan() {
                    DetailOutcome::Item(item) => {
                        if seen_ids.insert(item.id.clone()) {
                            items.push(item);
                            stats.new_items += 1;
                        }
                    }
                    DetailOutcome::References(references) => {
                        stats.references += references.len();
                        next.extend(references);
                    }
                    DetailOutcome::AdultContent => {
                        tracing::debug!("Skipping age-restricted item: {}", reference);
                        stats.adult += 1;
                    }
                    DetailOutcome::Empty => {
                        tracing::debug!("No media or teasers on {}", reference);
                        stats.empty += 1;
                    }
                }
            }

            tracing::info!(
                "Round {}: {} fetched, {} dropped, {} new items ({}/{} total), {} references, {} restricted, {} empty",
                round,
                stats.fetched,
                stats.dropped,
                stats.new_items,
                items.len(),
                target,
                stats.references,
                stats.adult,
                stats.empty
            );

            if items.len() >= target {
                break;
            }
            frontier = next;
        }

        items.truncate(target);
        tracing::info!("<<< Done: {} items from the home page", items.len());
        Ok(items)
    }
}

/// Drops references already visited or repeated within the batch, marking
/// the rest as visited; first occurrence wins
fn unvisited(references: Vec<CrawlReference>, visited: &mut HashSet<String>) -> Vec<CrawlReference> {
    references
        .into_iter()
        .filter(|reference| visited.insert(reference.key.clone()))
        .collect()
}
