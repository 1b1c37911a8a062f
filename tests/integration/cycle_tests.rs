//! Full aggregation cycles against mocked upstream and sink

use crate::common::{
    aggregator_config, create_aggregator, mount_json, mount_sink, mount_upstream,
    published_batch, LAST_PROCESSED_PATH, PUBLISH_PATH,
};
use std::time::Duration;
use stream_aggregator::{AggregatorConfig, CancellationRegistry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn parse_config(value: serde_json::Value) -> AggregatorConfig {
    serde_json::from_value(value).expect("Valid aggregator config")
}

#[tokio::test]
async fn test_full_cycle_publishes_merged_batch() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_upstream(&server, None).await;
    mount_sink(&server, 1).await;

    let aggregator = create_aggregator(&base);
    let registry = CancellationRegistry::new();
    let group = registry.begin_generation();

    let report = aggregator
        .run_cycle(&group, &parse_config(aggregator_config(false, None)))
        .await
        .expect("Cycle should succeed");

    assert_eq!(report.entries_run, 2);
    assert_eq!(report.items_collected, 4);
    assert_eq!(report.items_unique, 3);
    assert_eq!(report.urls_removed, 1);
    assert_eq!(report.segments_added, 2);
    assert_eq!(report.items_published, 3);
    assert!(report.finished_at.is_some());

    let batch = published_batch(&server).await;
    let items = batch.as_array().expect("Batch is an array");
    let ids: Vec<&str> = items.iter().map(|item| item["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["p1", "shared", "h1"]);

    // Manifest first, then its segments in playlist order
    assert_eq!(
        items[0]["streamUrls"],
        serde_json::json!([
            format!("{}/hls/p1/master.m3u8", base),
            format!("{}/hls/p1/v/seg0.ts", base),
            format!("{}/hls/p1/v/seg1.ts", base)
        ])
    );
    assert_eq!(items[0]["streams"][0]["type"], "hls");
    assert_eq!(items[0]["streams"].as_array().unwrap().len(), 1);

    // The publication copy wins over the home page copy and loses its mp4
    assert_eq!(items[1]["title"], "Publication 2");
    assert_eq!(items[1]["streamUrls"], serde_json::json!([]));

    assert_eq!(items[2]["streams"][0]["type"], "dash");
    assert_eq!(items[2]["synopsis"], "Synopsis");
}

#[tokio::test]
async fn test_unsupported_criterion_contributes_nothing() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 1).await;

    let config = parse_config(serde_json::json!({
        "name": "default",
        "cronEnabled": false,
        "entries": [
            {"criterion": "most-viewed", "value": 5},
            {"criterion": "latest-publications", "value": 1}
        ]
    }));

    let aggregator = create_aggregator(&server.uri());
    let registry = CancellationRegistry::new();
    let group = registry.begin_generation();
    let report = aggregator.run_cycle(&group, &config).await.unwrap();

    assert_eq!(report.entries_run, 1);
    assert_eq!(report.items_published, 1);
}

#[tokio::test]
async fn test_failing_source_still_publishes_the_other() {
    let server = MockServer::start().await;
    let base = server.uri();
    // Only the home page side is mounted; the listing answers 404
    mount_json(
        &server,
        "/home",
        serde_json::json!({"widgets": [{"type": "gridlist", "teasers": [
            {"type": "ondemand", "links": {"target": {"href": format!("{}/pages/b", base)}}}
        ]}]}),
    )
    .await;
    mount_json(
        &server,
        "/pages/b",
        serde_json::json!({"widgets": [{
            "type": "player_ondemand",
            "id": "h1",
            "mediaCollection": {"embedded": {"_mediaArray": [
                {"_mediaStreamArray": [{"_stream": format!("{}/dash/h1.mpd", base)}]}
            ]}}
        }]}),
    )
    .await;
    mount_sink(&server, 1).await;

    let aggregator = create_aggregator(&base);
    let registry = CancellationRegistry::new();
    let group = registry.begin_generation();
    let report = aggregator
        .run_cycle(&group, &parse_config(aggregator_config(false, None)))
        .await
        .unwrap();

    assert_eq!(report.items_published, 1);
    let batch = published_batch(&server).await;
    assert_eq!(batch[0]["id"], "h1");
}

#[tokio::test]
async fn test_cancelled_cycle_publishes_nothing() {
    let server = MockServer::start().await;
    mount_upstream(&server, Some(Duration::from_secs(10))).await;
    mount_sink(&server, 0).await;

    let aggregator = create_aggregator(&server.uri());
    let registry = CancellationRegistry::new();
    let group = registry.begin_generation();
    let config = parse_config(aggregator_config(false, None));

    let (result, _) = tokio::join!(aggregator.run_cycle(&group, &config), async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        registry.begin_generation()
    });

    let err = result.expect_err("Superseded cycle must not succeed");
    assert!(err.is_cancelled());
    assert_eq!(registry.pending(), 0);
}

#[tokio::test]
async fn test_superseded_during_publish_skips_completion_record() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    Mock::given(method("POST"))
        .and(path(PUBLISH_PATH))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(800)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(LAST_PROCESSED_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let aggregator = create_aggregator(&server.uri());
    let registry = CancellationRegistry::new();
    let group = registry.begin_generation();
    let config = parse_config(aggregator_config(false, None));

    let (result, _) = tokio::join!(aggregator.run_cycle(&group, &config), async {
        // Supersede once the publish request is in flight
        loop {
            let requests = server.received_requests().await.unwrap_or_default();
            if requests.iter().any(|request| request.url.path() == PUBLISH_PATH) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        registry.begin_generation()
    });

    let err = result.expect_err("Superseded cycle must not report success");
    assert!(err.is_cancelled());
}
