use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::time::sleep;
use tokio::time::timeout;

use crate::test_utils::enable_logger;
use crate::test_utils::InMemoryRegistry;
use crate::ChangeAction;
use crate::ChangeEvent;
use crate::ConfigMirror;
use crate::RetryPolicy;

const POLL_GRACE: Duration = Duration::from_millis(150);
const RECV_WINDOW: Duration = Duration::from_secs(3);

async fn mirror_over(registry: &Arc<InMemoryRegistry>) -> ConfigMirror {
    ConfigMirror::builder(registry.clone())
        .watch_timeout(Duration::from_millis(200))
        .retry_policy(RetryPolicy {
            max_attempts: 1,
            delay_ms: 1,
        })
        .build()
        .await
        .expect("build mirror")
}

#[tokio::test]
async fn test_unrecognized_action_is_dropped() {
    enable_logger();
    let registry = Arc::new(InMemoryRegistry::new());
    let mirror = mirror_over(&registry).await;

    let mut subscription = mirror.subscribe("app").await.expect("subscribe");
    sleep(POLL_GRACE).await;

    // An action outside the normalized vocabulary never reaches the sink
    registry.emit_raw("app/x", "compact", Some("1"));
    sleep(POLL_GRACE).await;
    registry.put("app/x", "2");

    let event = timeout(RECV_WINDOW, subscription.recv())
        .await
        .expect("event within window")
        .expect("subscription alive");
    assert_eq!(event.value.as_deref(), Some("2"));

    mirror.stop_watchers().await;
}

#[tokio::test]
async fn test_subscription_into_stream() {
    let registry = Arc::new(InMemoryRegistry::new());
    let mirror = mirror_over(&registry).await;

    let subscription = mirror.subscribe("app").await.expect("subscribe");
    let mut stream = subscription.into_stream();
    sleep(POLL_GRACE).await;

    registry.put("app/x", "1");

    let event = timeout(RECV_WINDOW, stream.next())
        .await
        .expect("event within window")
        .expect("stream alive");
    assert_eq!(event.key, "/app/x");
    assert_eq!(event.action, ChangeAction::Set);

    mirror.stop_watchers().await;
}

#[tokio::test]
async fn test_prefix_stream_implements_stream() {
    let registry = Arc::new(InMemoryRegistry::new());
    let mirror = mirror_over(&registry).await;

    let mut stream = mirror.watch_prefix("app").await.expect("open stream");
    sleep(POLL_GRACE).await;

    registry.put("app/x", "1");

    let event = timeout(RECV_WINDOW, stream.next())
        .await
        .expect("event within window")
        .expect("stream alive");
    assert_eq!(event.key, "/app/x");

    stream.cancel();
    let end = timeout(RECV_WINDOW, stream.next()).await.expect("stream ends");
    assert!(end.is_none());
}

#[tokio::test]
async fn test_set_on_change_applies_to_live_subscription() {
    let registry = Arc::new(InMemoryRegistry::new());
    let mirror = mirror_over(&registry).await;

    mirror.watch("app").await.expect("watch");
    sleep(POLL_GRACE).await;

    // No callback registered yet: this event is only logged
    registry.put("app/x", "1");
    sleep(POLL_GRACE).await;

    let changes: Arc<Mutex<Vec<ChangeEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let collected = changes.clone();
    mirror.set_on_change(move |event| collected.lock().push(event.clone()));
    sleep(POLL_GRACE).await;

    registry.put("app/x", "2");

    let mut observed = Vec::new();
    for _ in 0..30 {
        observed = changes.lock().clone();
        if !observed.is_empty() {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].value.as_deref(), Some("2"));

    mirror.stop_watchers().await;
}

#[tokio::test]
async fn test_engine_is_terminal_after_stop() {
    let registry = Arc::new(InMemoryRegistry::new());
    let mirror = mirror_over(&registry).await;

    mirror.stop_watchers().await;

    // Subscriptions created after the global stop are born canceled
    let mut subscription = mirror.subscribe("app").await.expect("subscribe");
    let closed = timeout(RECV_WINDOW, subscription.recv()).await.expect("closed");
    assert!(closed.is_none());
}
