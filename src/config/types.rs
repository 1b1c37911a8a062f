use serde::Deserialize;
use std::time::Duration;

/// Main service configuration for the stream aggregator
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Upstream API entry points
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// First page of the "latest publications" listing
    #[serde(rename = "latest-url")]
    pub latest_url: String,

    /// Home page of the widget-based page gateway
    #[serde(rename = "home-url")]
    pub home_url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of simultaneous detail fetches in the breadth-first crawl
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Additional rounds granted to fetches that timed out
    #[serde(rename = "timeout-retries", default = "default_timeout_retries")]
    pub timeout_retries: u32,

    /// Per-request timeout for home page and detail fetches (seconds)
    #[serde(rename = "detail-timeout-secs", default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,

    /// Upper bound on breadth-first expansion rounds
    #[serde(rename = "max-rounds", default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Scheme forced onto HLS manifest URLs before they are fetched
    #[serde(rename = "manifest-scheme", default = "default_manifest_scheme")]
    pub manifest_scheme: String,
}

impl CrawlerConfig {
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            timeout_retries: default_timeout_retries(),
            detail_timeout_secs: default_detail_timeout_secs(),
            max_rounds: default_max_rounds(),
            manifest_scheme: default_manifest_scheme(),
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    127
}

fn default_timeout_retries() -> u32 {
    3
}

fn default_detail_timeout_secs() -> u64 {
    30
}

fn default_max_rounds() -> u32 {
    8
}

fn default_manifest_scheme() -> String {
    "https".to_string()
}

/// Downstream sink configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Base URL of the state API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path receiving the published batch
    #[serde(rename = "publish-path", default = "default_publish_path")]
    pub publish_path: String,

    /// Upper bound for every request to the state API (seconds)
    #[serde(rename = "timeout-secs", default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_publish_path() -> String {
    "/cache-state".to_string()
}

fn default_sink_timeout_secs() -> u64 {
    30
}

/// Configuration-change notification settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Topic carrying new configuration URLs
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Configuration URL announced once at startup
    #[serde(rename = "config-url", default)]
    pub config_url: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            config_url: None,
        }
    }
}

fn default_topic() -> String {
    "new-aggregator-config".to_string()
}

/// Local output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where the pagination crawler dumps its raw result (debug aid)
    #[serde(rename = "snapshot-path", default)]
    pub snapshot_path: Option<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
