//! Per-item post-processing steps of a cycle

use crate::model::{MediaItem, Stream, StreamType};
use std::collections::HashSet;

/// Stream types that are never published
pub const UNWANTED_TYPES: [StreamType; 2] = [StreamType::Mp4, StreamType::F4m];

/// Keeps the first item of every id, preserving order
pub fn dedupe_by_id(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Removes URLs of unwanted stream types; returns how many were removed
pub fn remove_unwanted_urls(item: &mut MediaItem) -> usize {
    let before = item.stream_urls.len();
    item.stream_urls
        .retain(|url| !UNWANTED_TYPES.iter().any(|kind| kind.matches(url)));
    before - item.stream_urls.len()
}

/// Rebuilds `streams` from the current stream URLs
///
/// URLs matching no known type are kept with a `None` type.
pub fn classify_streams(item: &mut MediaItem) {
    item.streams = item
        .stream_urls
        .iter()
        .map(|url| Stream {
            url: url.clone(),
            stream_type: StreamType::detect(url),
        })
        .collect();
}

/// Drops blank stream URLs; returns how many were dropped
pub fn prune_stream_urls(item: &mut MediaItem) -> usize {
    let before = item.stream_urls.len();
    item.stream_urls.retain(|url| !url.trim().is_empty());
    before - item.stream_urls.len()
}
