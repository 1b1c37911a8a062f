use crate::fetch::{CancelGroup, FetchError, FetchOptions, Fetcher};
use crate::model::{MediaItem, StreamType};
use crate::url::{rectify_url, resolve_uri};
use futures::future::try_join_all;
use m3u8_rs::Playlist;
use url::Url;

/// Expands HLS master manifests into their segment URLs
pub struct ManifestResolver {
    fetcher: Fetcher,
    scheme: String,
    options: FetchOptions,
}

impl ManifestResolver {
    /// `scheme` is forced onto every manifest and segment URL
    pub fn new(fetcher: Fetcher, scheme: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            fetcher,
            scheme: scheme.into(),
            options,
        }
    }

    /// Appends the segment URLs of every HLS manifest listed on `item`
    ///
    /// Existing URLs are never removed or reordered. A manifest that fails
    /// to load or parse, or one of whose variants does, contributes
    /// nothing; only a cancellation is returned as an error. Returns the
    /// number of URLs added.
    pub async fn resolve(
        &self,
        group: &CancelGroup,
        item: &mut MediaItem,
    ) -> Result<usize, FetchError> {
        let manifests: Vec<String> = item
            .stream_urls
            .iter()
            .filter(|url| StreamType::Hls.matches(url))
            .map(|url| rectify_url(url, &self.scheme))
            .collect();

        if manifests.is_empty() {
            return Ok(0);
        }

        let segments = try_join_all(
            manifests
                .iter()
                .map(|manifest| self.resolve_master(group, manifest)),
        )
        .await?;

        let added = item.append_stream_urls(segments.into_iter().flatten());
        tracing::debug!(
            "Resolved {} manifests of {} into {} segment URLs",
            manifests.len(),
            item.id,
            added
        );
        Ok(added)
    }

    async fn resolve_master(
        &self,
        group: &CancelGroup,
        manifest_url: &str,
    ) -> Result<Vec<String>, FetchError> {
        let Some((base, playlist)) = self.load(group, manifest_url).await? else {
            return Ok(Vec::new());
        };

        match playlist {
            Playlist::MasterPlaylist(master) => {
                let variants: Vec<String> = master
                    .variants
                    .iter()
                    .filter_map(|variant| resolve_uri(&base, &variant.uri))
                    .map(|url| rectify_url(url.as_str(), &self.scheme))
                    .collect();
                tracing::trace!("{} lists {} variants", manifest_url, variants.len());

                let segments = try_join_all(
                    variants
                        .iter()
                        .map(|variant| self.resolve_variant(group, variant)),
                )
                .await?;

                // One unusable variant discards the whole manifest
                match segments.into_iter().collect::<Option<Vec<_>>>() {
                    Some(segments) => Ok(segments.into_iter().flatten().collect()),
                    None => {
                        tracing::warn!(
                            "Dropping manifest {}: at least one variant is unusable",
                            manifest_url
                        );
                        Ok(Vec::new())
                    }
                }
            }
            // Served a media playlist directly; its segments are the result
            Playlist::MediaPlaylist(media) => Ok(self.segment_urls(&base, &media)),
        }
    }

    /// Segment URLs of one variant; `None` when it cannot be used
    async fn resolve_variant(
        &self,
        group: &CancelGroup,
        variant_url: &str,
    ) -> Result<Option<Vec<String>>, FetchError> {
        let Some((base, playlist)) = self.load(group, variant_url).await? else {
            return Ok(None);
        };

        match playlist {
            Playlist::MediaPlaylist(media) => Ok(Some(self.segment_urls(&base, &media))),
            Playlist::MasterPlaylist(_) => {
                tracing::warn!("Variant {} is a master playlist", variant_url);
                Ok(None)
            }
        }
    }

    /// Fetches and parses a playlist; `None` when it is unusable
    async fn load(
        &self,
        group: &CancelGroup,
        url: &str,
    ) -> Result<Option<(Url, Playlist)>, FetchError> {
        let base = match Url::parse(url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Skipping unparsable manifest URL {}: {}", url, e);
                return Ok(None);
            }
        };

        let body = match self.fetcher.fetch_text(group, url, self.options).await {
            Ok(body) => body,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!("Failed fetching manifest {}: {}", url, e);
                return Ok(None);
            }
        };

        match m3u8_rs::parse_playlist_res(body.as_bytes()) {
            Ok(playlist) => Ok(Some((base, playlist))),
            Err(e) => {
                tracing::warn!("Failed parsing manifest {}: {:?}", url, e);
                Ok(None)
            }
        }
    }

    fn segment_urls(&self, base: &Url, media: &m3u8_rs::MediaPlaylist) -> Vec<String> {
        media
            .segments
            .iter()
            .filter_map(|segment| resolve_uri(base, &segment.uri))
            .map(|url| rectify_url(url.as_str(), &self.scheme))
            .collect()
    }
}
