//! Media item records produced by the crawlers and published to the sink

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static MP4_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.mp4$|\.mp4[^\d\w\-_\.~,]").expect("valid mp4 regex"));
static HLS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.m3u8").expect("valid hls regex"));
static DASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.mpd").expect("valid dash regex"));
static F4M_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.f4m").expect("valid f4m regex"));

/// One playable content item as published downstream
///
/// `stream_urls` behaves like an ordered set: appending never duplicates
/// an entry and never reorders existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub available_to: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub stream_urls: Vec<String>,
    #[serde(default)]
    pub streams: Vec<Stream>,
}

impl MediaItem {
    /// Creates an item with no images and no stream URLs
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            synopsis: String::new(),
            available_to: None,
            images: Vec::new(),
            stream_urls: Vec::new(),
            streams: Vec::new(),
        }
    }

    /// Returns true if at least one stream URL is known
    pub fn has_streams(&self) -> bool {
        !self.stream_urls.is_empty()
    }

    /// Appends URLs that are not yet present, keeping first-seen order
    ///
    /// Returns the number of URLs actually added.
    pub fn append_stream_urls<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut known: HashSet<String> = self.stream_urls.iter().cloned().collect();
        let before = self.stream_urls.len();

        for url in urls {
            if known.insert(url.clone()) {
                self.stream_urls.push(url);
            }
        }

        self.stream_urls.len() - before
    }
}

/// Preview image attached to an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(alias = "src")]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "alt")]
    pub alt_text: Option<String>,
}

/// Transport type of a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Mp4,
    Hls,
    Dash,
    F4m,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mp4 => "mp4",
            Self::Hls => "hls",
            Self::Dash => "dash",
            Self::F4m => "f4m",
        };
        f.write_str(name)
    }
}

impl StreamType {
    /// Detection order; the first matching type wins
    pub const PRIORITY: [StreamType; 4] = [Self::Mp4, Self::Hls, Self::Dash, Self::F4m];

    /// Returns true if `url` carries this type's file extension
    pub fn matches(self, url: &str) -> bool {
        let pattern = match self {
            Self::Mp4 => &MP4_PATTERN,
            Self::Hls => &HLS_PATTERN,
            Self::Dash => &DASH_PATTERN,
            Self::F4m => &F4M_PATTERN,
        };
        pattern.is_match(url)
    }

    /// Classifies `url` by first match in priority order
    ///
    /// ```
    /// use stream_aggregator::StreamType;
    ///
    /// assert_eq!(StreamType::detect("https://cdn/a.m3u8"), Some(StreamType::Hls));
    /// assert_eq!(StreamType::detect("https://cdn/a.mp4?x=1"), Some(StreamType::Mp4));
    /// assert_eq!(StreamType::detect("https://cdn/a.webm"), None);
    /// ```
    pub fn detect(url: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|kind| kind.matches(url))
    }
}

/// A classified stream URL
///
/// `stream_type` is `None` (serialized as `null`) when no pattern matched;
/// the sink is expected to accept that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub url: String,
    #[serde(rename = "type")]
    pub stream_type: Option<StreamType>,
}
