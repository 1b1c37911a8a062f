//! Wire models of the publication asset API

use serde::{Deserialize, Serialize};

/// Binary type that marks a playable video resource
pub const VIDEO_BINARY_TYPE: &str = "VideoBinaryResource";

/// Link object used for pagination
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
}

/// One page of the "latest publications" listing
#[derive(Debug, Clone, Deserialize)]
pub struct PublicationSet {
    #[serde(default)]
    pub elements: Vec<PublicationReference>,
    #[serde(default)]
    pub next: Option<Link>,
}

/// Reference to a publication detail resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationReference {
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl PublicationReference {
    /// Identity used when the detail resource cannot be fetched
    pub fn fallback_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.href.clone())
    }
}

/// Publication detail resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub plot_summary: Option<String>,
    #[serde(default)]
    pub available_to: Option<String>,
    #[serde(default)]
    pub binaries: Vec<BinaryReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryReference {
    pub href: String,
}

/// Binary resource behind a `BinaryReference`
#[derive(Debug, Clone, Deserialize)]
pub struct Binary {
    #[serde(rename = "_type")]
    pub kind: String,
    pub href: String,
}

impl Binary {
    pub fn is_video(&self) -> bool {
        self.kind == VIDEO_BINARY_TYPE
    }
}
