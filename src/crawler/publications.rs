//! Bulk-pagination crawler over the "latest publications" listing
//!
//! 1. Follow `next` links, collecting publication references, until enough
//!    references are gathered or the listing ends
//! 2. Truncate to exactly the requested amount, keeping listing order
//! 3. Fetch every publication detail and its binaries concurrently
//! 4. Keep the hrefs of video binaries as the item's stream URLs
//!
//! A failing page stops pagination but keeps what was gathered. A failing
//! detail fetch yields a placeholder item without streams. Only a
//! cancellation aborts the crawl.

use crate::crawler::publication_models::{
    Binary, BinaryReference, Publication, PublicationReference, PublicationSet,
};
use crate::fetch::{CancelGroup, FetchError, FetchOptions, Fetcher};
use crate::model::MediaItem;
use crate::sink::SnapshotWriter;
use futures::future::try_join_all;
use std::time::Duration;

pub struct PublicationsCrawler {
    fetcher: Fetcher,
    latest_url: String,
    options: FetchOptions,
    snapshot: Option<SnapshotWriter>,
}

impl PublicationsCrawler {
    pub fn new(fetcher: Fetcher, latest_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            latest_url: latest_url.into(),
            options: FetchOptions::default(),
            snapshot: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options = FetchOptions::with_timeout(timeout);
        self
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotWriter) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Returns the `amount` most recent publications as media items
    ///
    /// The result holds exactly `min(amount, available)` items in listing
    /// order. `amount == 0` returns immediately without any request.
    pub async fn get_latest(
        &self,
        group: &CancelGroup,
        amount: usize,
    ) -> Result<Vec<MediaItem>, FetchError> {
        if amount == 0 {
            return Ok(Vec::new());
        }

        tracing::info!(">>> Start: fetching {} latest publications", amount);
        let references = self.collect_references(group, amount).await?;
        tracing::info!("Retrieved #{} publication references", references.len());

        let items = try_join_all(
            references
                .iter()
                .map(|reference| self.expand_publication(group, reference)),
        )
        .await?;

        let with_streams = items.iter().filter(|item| item.has_streams()).count();
        tracing::info!(
            "<<< Done: {} publications, {} with streams",
            items.len(),
            with_streams
        );

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.write(&items).await {
                tracing::warn!(
                    "Failed writing snapshot to {}: {}",
                    snapshot.path().display(),
                    e
                );
            }
        }

        Ok(items)
    }

    async fn collect_references(
        &self,
        group: &CancelGroup,
        amount: usize,
    ) -> Result<Vec<PublicationReference>, FetchError> {
        let mut references = Vec::new();
        let mut page_url = Some(self.latest_url.clone());
        let mut pages = 0usize;

        while references.len() < amount {
            let Some(url) = page_url.take() else {
                tracing::debug!("Listing exhausted after {} pages", pages);
                break;
            };

            let page = match self
                .fetcher
                .fetch_json::<PublicationSet>(group, &url, self.options)
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::error!(
                        "Failed fetching publication page {}, keeping {} references: {}",
                        url,
                        references.len(),
                        e
                    );
                    break;
                }
            };

            pages += 1;
            tracing::debug!("Retrieved page #{} with {} elements", pages, page.elements.len());

            if page.elements.is_empty() {
                break;
            }
            references.extend(page.elements);
            page_url = page.next.map(|link| link.href);
        }

        references.truncate(amount);
        Ok(references)
    }

    async fn expand_publication(
        &self,
        group: &CancelGroup,
        reference: &PublicationReference,
    ) -> Result<MediaItem, FetchError> {
        let publication = match self
            .fetcher
            .fetch_json::<Publication>(group, &reference.href, self.options)
            .await
        {
            Ok(publication) => publication,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::error!("Failed fetching publication {}: {}", reference.href, e);
                return Ok(MediaItem::new(reference.fallback_id(), String::new()));
            }
        };

        let binaries = try_join_all(
            publication
                .binaries
                .iter()
                .map(|binary| self.fetch_binary(group, binary)),
        )
        .await?;

        let mut item = MediaItem::new(publication.id, publication.title.unwrap_or_default());
        item.synopsis = publication.plot_summary.unwrap_or_default();
        item.available_to = publication.available_to;
        let added = item.append_stream_urls(
            binaries
                .into_iter()
                .flatten()
                .filter(Binary::is_video)
                .map(|binary| binary.href),
        );
        tracing::trace!("Publication {} has {} video binaries", item.id, added);

        Ok(item)
    }

    async fn fetch_binary(
        &self,
        group: &CancelGroup,
        binary: &BinaryReference,
    ) -> Result<Option<Binary>, FetchError> {
        match self
            .fetcher
            .fetch_json::<Binary>(group, &binary.href, self.options)
            .await
        {
            Ok(binary) => Ok(Some(binary)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::warn!("Skipping binary {}: {}", binary.href, e);
                Ok(None)
            }
        }
    }
}
