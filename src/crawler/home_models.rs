//! Wire models of the widget-based page gateway
//!
//! A page is a list of widgets discriminated by their `type` field. Container
//! widgets (`stage`, `gridlist`) carry teasers linking to further pages; a
//! `player_ondemand` widget carries the playable media of one item.

use crate::model::{Image, MediaItem};
use crate::url::reference_key;
use serde::Deserialize;
use std::fmt;

/// Maturity rating that gates playback behind age verification
pub const ADULT_RATING: &str = "FSK18";

/// A page of the gateway, home page or detail page alike
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Widget {
    #[serde(rename = "player_ondemand")]
    PlayerOnDemand(PlayerWidget),
    #[serde(rename = "stage")]
    Stage(TeaserWidget),
    #[serde(rename = "gridlist")]
    GridList(TeaserWidget),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeaserWidget {
    #[serde(default)]
    pub teasers: Vec<Teaser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeaserKind {
    Ondemand,
    Compilation,
    Show,
    Poster,
    Live,
    EditorialPage,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teaser {
    #[serde(rename = "type")]
    pub kind: TeaserKind,
    #[serde(default)]
    pub long_title: Option<String>,
    #[serde(default)]
    pub links: Option<TeaserLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeaserLinks {
    #[serde(default)]
    pub target: Option<TeaserTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeaserTarget {
    #[serde(default)]
    pub href: Option<String>,
}

impl Teaser {
    /// Reference to the teaser's target page; live teasers are not followed
    pub fn reference(&self) -> Option<CrawlReference> {
        if self.kind == TeaserKind::Live {
            return None;
        }
        let href = self.links.as_ref()?.target.as_ref()?.href.as_deref()?;
        if href.trim().is_empty() {
            return None;
        }
        Some(CrawlReference::new(href).with_title(self.long_title.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWidget {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub available_to: Option<String>,
    #[serde(default)]
    pub image: Option<WidgetImage>,
    #[serde(default)]
    pub media_collection: Option<MediaCollection>,
    #[serde(default)]
    pub blocked_by_fsk: Option<bool>,
    #[serde(default)]
    pub maturity_content_rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetImage {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaCollection {
    #[serde(default)]
    pub embedded: Option<EmbeddedMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedMedia {
    #[serde(rename = "_mediaArray", default)]
    pub media: Vec<MediaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntry {
    #[serde(rename = "_mediaStreamArray", default)]
    pub streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaStream {
    #[serde(rename = "_stream", default)]
    pub stream: Option<StreamValue>,
}

/// `_stream` is either a single URL or a list of URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StreamValue {
    One(String),
    Many(Vec<String>),
}

impl PlayerWidget {
    /// Every stream URL of the media collection, in document order
    pub fn stream_urls(&self) -> Vec<String> {
        let Some(embedded) = self
            .media_collection
            .as_ref()
            .and_then(|collection| collection.embedded.as_ref())
        else {
            return Vec::new();
        };

        embedded
            .media
            .iter()
            .flat_map(|entry| entry.streams.iter())
            .filter_map(|stream| stream.stream.as_ref())
            .flat_map(|value| match value {
                StreamValue::One(url) => vec![url.clone()],
                StreamValue::Many(urls) => urls.clone(),
            })
            .filter(|url| !url.trim().is_empty())
            .collect()
    }

    /// True if playback is gated behind age verification
    pub fn is_adult_restricted(&self) -> bool {
        self.blocked_by_fsk.unwrap_or(false)
            || self.maturity_content_rating.as_deref() == Some(ADULT_RATING)
    }

    /// `None` when the widget carries no usable id
    pub fn into_media_item(self) -> Option<MediaItem> {
        let id = self.id.clone().filter(|id| !id.trim().is_empty())?;
        let stream_urls = self.stream_urls();
        let mut item = MediaItem::new(id, self.title.unwrap_or_default());
        item.synopsis = self.synopsis.unwrap_or_default();
        item.available_to = self.available_to;
        if let Some(image) = self.image {
            if let Some(url) = image.src {
                item.images.push(Image {
                    url,
                    title: image.title,
                    alt_text: image.alt,
                });
            }
        }
        item.append_stream_urls(stream_urls);
        Some(item)
    }
}

/// A link discovered during the breadth-first crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReference {
    pub href: String,
    /// Normalized form used for deduplication
    pub key: String,
    pub title: Option<String>,
}

impl CrawlReference {
    pub fn new(href: &str) -> Self {
        Self {
            href: href.to_string(),
            key: reference_key(href),
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

impl fmt::Display for CrawlReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

/// What a fetched page contributes to the crawl
#[derive(Debug, Clone)]
pub enum DetailOutcome {
    /// A playable item with stream data
    Item(MediaItem),
    /// Further pages to visit
    References(Vec<CrawlReference>),
    /// Age-restricted item without stream data
    AdultContent,
    /// Nothing usable
    Empty,
}

impl Page {
    /// References of all container teasers on this page
    pub fn references(&self) -> Vec<CrawlReference> {
        self.widgets
            .iter()
            .filter_map(|widget| match widget {
                Widget::Stage(container) | Widget::GridList(container) => Some(container),
                _ => None,
            })
            .flat_map(|container| container.teasers.iter())
            .filter_map(Teaser::reference)
            .collect()
    }

    /// Scans widgets in order; the first player widget with stream data
    /// makes the page a terminal item and its references are ignored
    pub fn scan(self) -> DetailOutcome {
        let mut references = Vec::new();
        let mut adult = false;

        for widget in self.widgets {
            match widget {
                Widget::PlayerOnDemand(player) => {
                    if !player.stream_urls().is_empty() {
                        match player.into_media_item() {
                            Some(item) => return DetailOutcome::Item(item),
                            None => {
                                tracing::warn!("Skipping player widget without id");
                                continue;
                            }
                        }
                    }
                    adult |= player.is_adult_restricted();
                }
                Widget::Stage(container) | Widget::GridList(container) => {
                    references.extend(container.teasers.iter().filter_map(Teaser::reference));
                }
                Widget::Other => {}
            }
        }

        if !references.is_empty() {
            DetailOutcome::References(references)
        } else if adult {
            DetailOutcome::AdultContent
        } else {
            DetailOutcome::Empty
        }
    }
}
