//! Scheduler behavior against mocked upstream and sink

use crate::common::{
    aggregator_config, create_aggregator, mount_sink, mount_upstream, CONFIG_PATH,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_aggregator::notify::{
    ChannelNotifier, ConnectionState, Notifier, NotifierError, NotifierMessage,
};
use stream_aggregator::scheduler::Phase;
use stream_aggregator::{CancellationRegistry, Scheduler};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_scheduler(server: &MockServer) -> Scheduler {
    Scheduler::new(create_aggregator(&server.uri()), CancellationRegistry::new())
}

/// Serves `first` once, then `then` for every later request
async fn mount_config_sequence(server: &MockServer, at: &str, first: Value, then: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(then))
        .mount(server)
        .await;
}

async fn mount_config(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn hours_ago(hours: i64) -> i64 {
    (chrono::Utc::now() - chrono::Duration::hours(hours)).timestamp_millis()
}

/// Polls `condition` for up to five seconds
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("Condition not met within 5s");
}

#[tokio::test]
async fn test_never_processed_runs_once_then_idles() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 1).await;
    mount_config_sequence(
        &server,
        CONFIG_PATH,
        aggregator_config(false, None),
        aggregator_config(false, Some(hours_ago(0))),
    )
    .await;

    let scheduler = create_scheduler(&server);
    let driver = scheduler.on_config_url(format!("{}{}", server.uri(), CONFIG_PATH));
    tokio::time::timeout(Duration::from_secs(10), driver)
        .await
        .expect("Driver should finish")
        .unwrap();

    assert_eq!(scheduler.phase(), Phase::Idle);
    let report = scheduler.last_report().expect("A cycle should have run");
    assert_eq!(report.items_published, 3);
}

#[tokio::test]
async fn test_cron_within_interval_arms_timer() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 0).await;
    mount_config(&server, CONFIG_PATH, aggregator_config(true, Some(hours_ago(5)))).await;

    let scheduler = create_scheduler(&server);
    let driver = scheduler.on_config_url(format!("{}{}", server.uri(), CONFIG_PATH));
    wait_until(|| matches!(scheduler.phase(), Phase::Armed { .. })).await;

    match scheduler.phase() {
        Phase::Armed { delay } => {
            let remaining = delay.as_secs_f64() / 3600.0;
            assert!((remaining - 5.0).abs() < 0.01, "unexpected delay {:?}", delay);
        }
        other => panic!("expected armed timer, got {:?}", other),
    }

    scheduler.shutdown();
    tokio::time::timeout(Duration::from_secs(5), driver)
        .await
        .expect("Cancelled timer should end the driver")
        .unwrap();
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert!(scheduler.last_report().is_none());
}

#[tokio::test]
async fn test_new_configuration_supersedes_pending_timer() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 0).await;
    mount_config(&server, CONFIG_PATH, aggregator_config(true, Some(hours_ago(1)))).await;
    mount_config(
        &server,
        "/aggregator/config/manual",
        aggregator_config(false, Some(hours_ago(1))),
    )
    .await;

    let scheduler = create_scheduler(&server);
    let first = scheduler.on_config_url(format!("{}{}", server.uri(), CONFIG_PATH));
    wait_until(|| matches!(scheduler.phase(), Phase::Armed { .. })).await;

    let second = scheduler.on_config_url(format!("{}/aggregator/config/manual", server.uri()));
    tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("Superseded driver should end")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), second)
        .await
        .expect("Processed configuration without cron should end")
        .unwrap();

    assert_eq!(scheduler.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_new_configuration_cancels_running_cycle() {
    let server = MockServer::start().await;
    mount_upstream(&server, Some(Duration::from_secs(10))).await;
    mount_sink(&server, 0).await;
    mount_config(&server, CONFIG_PATH, aggregator_config(false, None)).await;
    mount_config(
        &server,
        "/aggregator/config/manual",
        aggregator_config(false, Some(hours_ago(1))),
    )
    .await;

    let scheduler = create_scheduler(&server);
    let first = scheduler.on_config_url(format!("{}{}", server.uri(), CONFIG_PATH));
    wait_until(|| scheduler.phase() == Phase::Running).await;

    let second = scheduler.on_config_url(format!("{}/aggregator/config/manual", server.uri()));
    tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("Cancelled cycle should end promptly")
        .unwrap();
    second.await.unwrap();

    assert!(scheduler.last_report().is_none());
}

#[tokio::test]
async fn test_invalid_configuration_is_not_scheduled() {
    let server = MockServer::start().await;
    mount_sink(&server, 0).await;
    mount_config(
        &server,
        CONFIG_PATH,
        serde_json::json!({"name": "default", "entries": []}),
    )
    .await;

    let scheduler = create_scheduler(&server);
    scheduler
        .on_config_url(format!("{}{}", server.uri(), CONFIG_PATH))
        .await
        .unwrap();

    assert_eq!(scheduler.phase(), Phase::Idle);
    assert!(scheduler.last_report().is_none());
}

#[tokio::test]
async fn test_run_consumes_notifications() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 1).await;
    mount_config_sequence(
        &server,
        CONFIG_PATH,
        aggregator_config(false, None),
        aggregator_config(false, Some(hours_ago(0))),
    )
    .await;

    let scheduler = Arc::new(create_scheduler(&server));
    let notifier = Arc::new(ChannelNotifier::new());
    notifier.publish("configs", format!("{}{}", server.uri(), CONFIG_PATH));

    let service = {
        let scheduler = Arc::clone(&scheduler);
        let notifier = Arc::clone(&notifier);
        tokio::spawn(async move { scheduler.run(notifier.as_ref(), "configs").await })
    };

    // Nothing happens until the transport reports a connection
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(scheduler.last_report().is_none());

    notifier.set_state(ConnectionState::Connected);
    wait_until(|| scheduler.last_report().is_some()).await;
    wait_until(|| scheduler.phase() == Phase::Idle).await;

    service.abort();
    scheduler.shutdown();
}

/// Channel notifier whose first subscription attempt fails
struct FlakySubscription {
    inner: ChannelNotifier,
    attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for FlakySubscription {
    fn connection_changes(&self) -> BoxStream<'static, ConnectionState> {
        self.inner.connection_changes()
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<BoxStream<'static, NotifierMessage>, NotifierError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(NotifierError::NotConnected);
        }
        self.inner.subscribe(topic).await
    }
}

#[tokio::test]
async fn test_failed_subscription_waits_for_next_connection() {
    let server = MockServer::start().await;
    mount_upstream(&server, None).await;
    mount_sink(&server, 1).await;
    mount_config_sequence(
        &server,
        CONFIG_PATH,
        aggregator_config(false, None),
        aggregator_config(false, Some(hours_ago(0))),
    )
    .await;

    let scheduler = Arc::new(create_scheduler(&server));
    let notifier = Arc::new(FlakySubscription {
        inner: ChannelNotifier::new(),
        attempts: AtomicUsize::new(0),
    });
    notifier
        .inner
        .publish("configs", format!("{}{}", server.uri(), CONFIG_PATH));
    notifier.inner.set_state(ConnectionState::Connected);

    let service = {
        let scheduler = Arc::clone(&scheduler);
        let notifier = Arc::clone(&notifier);
        tokio::spawn(async move { scheduler.run(notifier.as_ref(), "configs").await })
    };

    wait_until(|| notifier.attempts.load(Ordering::SeqCst) == 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!service.is_finished(), "A failed subscription must not stop the service");
    assert!(scheduler.last_report().is_none());

    // Reconnect; the retained configuration is delivered this time
    notifier.inner.set_state(ConnectionState::Disconnected);
    tokio::time::sleep(Duration::from_millis(50)).await;
    notifier.inner.set_state(ConnectionState::Connected);
    wait_until(|| scheduler.last_report().is_some()).await;
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 2);
    assert!(!service.is_finished());

    service.abort();
    scheduler.shutdown();
}
