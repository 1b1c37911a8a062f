//! Fetch layer: cancellable outbound HTTP requests
//!
//! - `Fetcher`: GET with per-request timeout, text or JSON body
//! - `CancellationRegistry` / `CancelGroup`: generation-scoped cancellation
//! - `FetchError`: failure taxonomy with `is_cancelled` / `is_timeout`

mod client;
mod error;
mod registry;

pub use client::{build_http_client, FetchOptions, Fetcher};
pub use error::FetchError;
pub use registry::{CancelGroup, CancellationRegistry};
