//! URL handling for crawl references and stream URLs
//!
//! This module provides the dedup key for crawl references, the secure
//! scheme rewrite applied before manifest fetches, and relative URI
//! resolution for playlist entries.

mod normalize;
mod scheme;

pub use normalize::reference_key;
pub use scheme::{rectify_url, resolve_uri};
