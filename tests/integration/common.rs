//! Shared fixtures: one mock server playing upstream and sink

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use stream_aggregator::config::{
    CrawlerConfig, NotifierConfig, OutputConfig, ServiceConfig, SinkConfig, SourcesConfig,
    UserAgentConfig,
};
use stream_aggregator::fetch::build_http_client;
use stream_aggregator::sink::{HttpSink, Sink};
use stream_aggregator::{Aggregator, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CONFIG_PATH: &str = "/aggregator/config/default";
pub const PUBLISH_PATH: &str = "/cache-state";
pub const LAST_PROCESSED_PATH: &str = "/aggregator/config/default/lastprocessed";

/// Creates a service configuration pointing everything at `base_url`
pub fn create_test_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        sources: SourcesConfig {
            latest_url: format!("{}/latest", base_url),
            home_url: format!("{}/home", base_url),
        },
        crawler: CrawlerConfig {
            detail_timeout_secs: 5,
            manifest_scheme: "http".to_string(),
            ..CrawlerConfig::default()
        },
        sink: SinkConfig {
            base_url: base_url.to_string(),
            publish_path: PUBLISH_PATH.to_string(),
            timeout_secs: 5,
        },
        notifier: NotifierConfig::default(),
        output: OutputConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestAggregator".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
    }
}

pub fn create_aggregator(base_url: &str) -> Arc<Aggregator> {
    let config = create_test_config(base_url);
    let client = build_http_client(&config.user_agent).expect("Failed to build client");
    let sink: Arc<dyn Sink> =
        Arc::new(HttpSink::new(client.clone(), &config.sink).expect("Invalid sink config"));
    Arc::new(Aggregator::from_config(&config, Fetcher::new(client), sink))
}

/// Aggregator configuration asking for two latest and two home items
pub fn aggregator_config(cron_enabled: bool, last_processed_at: Option<i64>) -> Value {
    json!({
        "name": "default",
        "cronEnabled": cron_enabled,
        "cronIntervalHours": 10,
        "lastProcessedAt": last_processed_at,
        "entries": [
            {"criterion": "latest-publications", "value": 2},
            {"criterion": "home-page-teasers", "value": 2}
        ]
    })
}

pub async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn player(id: &str, stream: String) -> Value {
    json!({"widgets": [{
        "type": "player_ondemand",
        "id": id,
        "title": format!("Title {}", id),
        "synopsis": "Synopsis",
        "mediaCollection": {"embedded": {"_mediaArray": [
            {"_mediaStreamArray": [{"_quality": "auto", "_stream": stream}]}
        ]}}
    }]})
}

/// Mounts both upstream APIs
///
/// | Source | Item | Stream URL |
/// |--------|------|------------|
/// | latest | `p1` | HLS master with one variant of two segments |
/// | latest | `shared` | mp4 file |
/// | home | `shared` | HLS master (duplicate id, dropped) |
/// | home | `h1` | DASH manifest |
///
/// `home_delay` delays the home detail pages.
pub async fn mount_upstream(server: &MockServer, home_delay: Option<Duration>) {
    let base = server.uri();

    mount_json(
        server,
        "/latest",
        json!({"elements": [
            {"href": format!("{}/publications/1", base)},
            {"href": format!("{}/publications/2", base)}
        ]}),
    )
    .await;
    mount_json(
        server,
        "/publications/1",
        json!({"id": "p1", "title": "Publication 1", "binaries": [{"href": format!("{}/binaries/1", base)}]}),
    )
    .await;
    mount_json(
        server,
        "/publications/2",
        json!({"id": "shared", "title": "Publication 2", "binaries": [{"href": format!("{}/binaries/2", base)}]}),
    )
    .await;
    mount_json(
        server,
        "/binaries/1",
        json!({"_type": "VideoBinaryResource", "href": format!("{}/hls/p1/master.m3u8", base)}),
    )
    .await;
    mount_json(
        server,
        "/binaries/2",
        json!({"_type": "VideoBinaryResource", "href": format!("{}/video/shared.mp4", base)}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/hls/p1/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nv/index.m3u8\n",
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/p1/v/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\nseg0.ts\n#EXTINF:10.0,\nseg1.ts\n#EXT-X-ENDLIST\n",
        ))
        .mount(server)
        .await;

    mount_json(
        server,
        "/home",
        json!({"widgets": [{"type": "gridlist", "teasers": [
            {"type": "ondemand", "links": {"target": {"href": format!("{}/pages/a", base)}}},
            {"type": "ondemand", "links": {"target": {"href": format!("{}/pages/b", base)}}},
            {"type": "live", "links": {"target": {"href": format!("{}/pages/live", base)}}}
        ]}]}),
    )
    .await;

    let pages = [
        ("/pages/a", player("shared", format!("{}/hls/shared/master.m3u8", base))),
        ("/pages/b", player("h1", format!("{}/dash/h1.mpd", base))),
    ];
    for (at, body) in pages {
        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if let Some(delay) = home_delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

/// Mounts the sink endpoints with the expected number of calls
pub async fn mount_sink(server: &MockServer, expected_cycles: u64) {
    Mock::given(method("POST"))
        .and(path(PUBLISH_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(expected_cycles)
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(LAST_PROCESSED_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(expected_cycles)
        .mount(server)
        .await;
}

/// Body of the last publish request
pub async fn published_batch(server: &MockServer) -> Value {
    let requests = server
        .received_requests()
        .await
        .expect("Request recording is enabled");
    let publish = requests
        .iter()
        .rev()
        .find(|request| request.method.to_string() == "POST" && request.url.path() == PUBLISH_PATH)
        .expect("No publish request received");
    serde_json::from_slice(&publish.body).expect("Publish body is JSON")
}
