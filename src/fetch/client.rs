//! HTTP fetcher shared by both crawlers and the manifest resolver
//!
//! This module handles all upstream GET requests, including:
//! - Building the HTTP client with a proper user agent string
//! - Registering every request under the active cancellation group
//! - Per-request timeouts
//! - Error classification (cancelled, timeout, status, network, decode)
//!
//! There is no retry here; callers own their retry policy.

use crate::config::UserAgentConfig;
use crate::fetch::registry::CancelGroup;
use crate::fetch::FetchError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-call fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound for the whole request; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use stream_aggregator::config::UserAgentConfig;
/// use stream_aggregator::fetch::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "StreamAggregator".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Cancellable GET requests
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL and returns its body as text
    ///
    /// # Request Flow
    ///
    /// 1. Refuse immediately if the group is already cancelled
    /// 2. Register the request under the group
    /// 3. Race the request against the group's cancellation
    /// 4. Deregister (on every exit path, via drop)
    /// 5. Report `Cancelled` if a newer generation started meanwhile
    ///
    /// # Error Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Group cancelled / superseded | `Cancelled` |
    /// | Timeout elapsed | `Timeout` |
    /// | Non-2xx status | `Status` |
    /// | Connection or body error | `Network` |
    pub async fn fetch_text(
        &self,
        group: &CancelGroup,
        url: &str,
        options: FetchOptions,
    ) -> Result<String, FetchError> {
        if group.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        let handle = group.register(url);
        tracing::trace!("GET {}", url);

        let outcome = tokio::select! {
            biased;
            _ = handle.cancelled() => {
                tracing::debug!("Cancelled request: {}", url);
                Err(FetchError::Cancelled { url: url.to_string() })
            }
            result = self.send(url, options) => result,
        };
        drop(handle);

        if outcome.is_ok() && group.is_stale() {
            tracing::debug!("Discarding late response of superseded generation: {}", url);
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        outcome
    }

    /// Fetches a URL and decodes the body as JSON
    pub async fn fetch_json<T>(
        &self,
        group: &CancelGroup,
        url: &str,
        options: FetchOptions,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let body = self.fetch_text(group, url, options).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn send(&self, url: &str, options: FetchOptions) -> Result<String, FetchError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
