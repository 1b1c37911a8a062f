use thiserror::Error;

/// Errors a single outbound fetch can end with
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Aborted by `cancel_all` or by a newer generation
    #[error("Request cancelled: {url}")]
    Cancelled { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Body arrived but was not the JSON shape we expected
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Body arrived but was not a playlist
    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// Operator-initiated cancellation; never logged as an error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Timeouts are the only failures the breadth-first crawl retries
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Cancelled { url }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::Network { url, .. }
            | Self::Decode { url, .. }
            | Self::Parse { url, .. } => url,
        }
    }

    /// Classifies a reqwest failure for the given URL
    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}
