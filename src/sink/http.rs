//! HTTP implementation of the sink

use crate::config::SinkConfig;
use crate::model::{AggregatorConfig, MediaItem};
use crate::sink::traits::{Sink, SinkError, SinkResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LastProcessedBody {
    last_processed_at: i64,
}

/// Sink backed by the downstream state REST API
///
/// | Operation | Request |
/// |-----------|---------|
/// | `fetch_config` | `GET <config url>` |
/// | `publish` | `POST <base>/<publish-path>` with the item array |
/// | `record_last_processed` | `PATCH <base>/aggregator/config/<name>/lastprocessed` |
pub struct HttpSink {
    client: Client,
    base_url: Url,
    publish_path: String,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(client: Client, config: &SinkConfig) -> SinkResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SinkError::Url(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            publish_path: config.publish_path.clone(),
            timeout: config.timeout(),
        })
    }

    /// Appends path segments to the base URL, escaping each one
    fn endpoint<'a, I>(&self, segments: I) -> SinkResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SinkError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn publish_url(&self) -> SinkResult<Url> {
        self.endpoint(self.publish_path.split('/').filter(|s| !s.is_empty()))
    }

    fn last_processed_url(&self, name: &str) -> SinkResult<Url> {
        self.endpoint(["aggregator", "config", name, "lastprocessed"])
    }
}

fn check_status(response: Response) -> SinkResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SinkError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn fetch_config(&self, config_url: &str) -> SinkResult<AggregatorConfig> {
        tracing::debug!("Loading aggregator configuration from {}", config_url);
        let response = check_status(
            self.client
                .get(config_url)
                .timeout(self.timeout)
                .send()
                .await?,
        )?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn publish(&self, items: &[MediaItem]) -> SinkResult<()> {
        let url = self.publish_url()?;
        tracing::info!("Publishing {} items to {}", items.len(), url);
        check_status(
            self.client
                .post(url)
                .timeout(self.timeout)
                .json(items)
                .send()
                .await?,
        )?;
        Ok(())
    }

    async fn record_last_processed(&self, name: &str, at: DateTime<Utc>) -> SinkResult<()> {
        let url = self.last_processed_url(name)?;
        let body = LastProcessedBody {
            last_processed_at: at.timestamp_millis(),
        };
        check_status(
            self.client
                .patch(url)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await?,
        )?;
        tracing::debug!("Recorded last processed time {} for '{}'", at, name);
        Ok(())
    }
}
