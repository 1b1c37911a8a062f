//! HLS manifest resolution
//!
//! For each HLS URL of an item the master manifest is fetched, every
//! variant playlist is fetched concurrently and the segment URIs are
//! appended to the item's stream URLs. Variant and segment URIs are
//! resolved against the playlist they were listed in.

mod resolver;

pub use resolver::ManifestResolver;
