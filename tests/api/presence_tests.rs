//! Presence Tests

use pretty_assertions::assert_eq;
use serde_json::json;

use chat_hub::config::MalformedPayloadPolicy;
use chat_hub::infrastructure::cache::{keys, Cache};

use crate::common::{closed_by_server, next_event, send_event, wait_until, Shared, TestApp};

#[tokio::test]
async fn test_observer_is_notified_of_online_and_offline() {
    let (app, shared) = TestApp::spawn().await;

    let mut observer = app.connect("/ws/presence?notifiers=2", 1).await;
    let snapshot = next_event(&mut observer).await;
    assert_eq!(snapshot["event"], "notify");
    assert_eq!(snapshot["payload"], json!({ "user_id": 2, "is_online": false, "last_seen_at": null }));

    let notifier = app.connect("/ws/presence", 2).await;
    let online = next_event(&mut observer).await;
    assert_eq!(online["event"], "notify");
    assert_eq!(online["room_id"], 2);
    assert_eq!(online["payload"]["user_id"], 2);
    assert_eq!(online["payload"]["is_online"], true);
    assert_eq!(
        shared.cache.get(&keys::online_status(2)).await.unwrap().as_deref(),
        Some("true")
    );

    drop(notifier);
    let offline = next_event(&mut observer).await;
    assert_eq!(offline["payload"]["user_id"], 2);
    assert_eq!(offline["payload"]["is_online"], false);
    assert!(offline["payload"]["last_seen_at"].is_string());
    assert_eq!(shared.store.presence(2).map(|p| p.is_online), Some(false));
}

#[tokio::test]
async fn test_subscribe_snapshot_reflects_current_state() {
    let (app, shared) = TestApp::spawn().await;

    let _notifier = app.connect("/ws/presence", 2).await;
    wait_until(|| shared.store.presence(2).is_some_and(|p| p.is_online)).await;
    let mut observer = app.connect("/ws/presence", 1).await;
    wait_until(|| app.hubs.presence.session_count() == 2).await;

    send_event(&mut observer, "subscribe", json!({ "notifiers": [2] })).await;

    // The observer's own online event went to room 1, which nobody watches.
    let snapshot = next_event(&mut observer).await;
    assert_eq!(snapshot["room_id"], 2);
    assert_eq!(snapshot["payload"]["is_online"], true);
    assert!(snapshot["payload"]["last_seen_at"].is_string());
}

#[tokio::test]
async fn test_subscribe_event_adds_notifiers() {
    let (app, _shared) = TestApp::spawn().await;

    let mut observer = app.connect("/ws/presence", 1).await;
    send_event(&mut observer, "subscribe", json!({ "notifiers": [3, 4] })).await;
    assert_eq!(next_event(&mut observer).await["payload"]["user_id"], 3);
    assert_eq!(next_event(&mut observer).await["payload"]["user_id"], 4);

    let _notifier = app.connect("/ws/presence", 4).await;
    let online = next_event(&mut observer).await;
    assert_eq!(online["payload"]["user_id"], 4);
    assert_eq!(online["payload"]["is_online"], true);
}

#[tokio::test]
async fn test_observer_disconnect_clears_subscriptions() {
    let (app, shared) = TestApp::spawn().await;

    let mut observer = app.connect("/ws/presence?notifiers=2,3", 1).await;
    // Each snapshot follows the cached edge of its notifier.
    next_event(&mut observer).await;
    next_event(&mut observer).await;
    assert_eq!(shared.cache.lrange(&keys::observing(1)).await.unwrap(), vec!["2", "3"]);

    drop(observer);

    wait_until(|| app.hubs.presence.session_count() == 0).await;
    assert_eq!(app.hubs.presence.registry().entry_count(), 0);
    assert_eq!(shared.store.presence(1).map(|p| p.is_online), Some(false));
    assert!(shared.cache.lrange(&keys::observing(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconnect_keeps_user_online() {
    let (app, shared) = TestApp::spawn().await;

    let mut first = app.connect("/ws/presence?notifiers=2", 1).await;
    next_event(&mut first).await;
    let mut second = app.connect("/ws/presence?notifiers=2", 1).await;
    next_event(&mut second).await;

    // The older connection is evicted from room 2 and closed.
    assert!(closed_by_server(&mut first).await);
    wait_until(|| app.hubs.presence.session_count() == 1).await;

    assert_eq!(shared.store.presence(1).map(|p| p.is_online), Some(true));
    assert_eq!(
        shared.cache.get(&keys::online_status(1)).await.unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(shared.cache.lrange(&keys::observing(1)).await.unwrap(), vec!["2"]);
    assert_eq!(app.hubs.presence.registry().room_len(2), 1);

    let _notifier = app.connect("/ws/presence", 2).await;
    let online = next_event(&mut second).await;
    assert_eq!(online["payload"]["user_id"], 2);
    assert_eq!(online["payload"]["is_online"], true);
}

#[tokio::test]
async fn test_shutdown_takes_every_presence_session_offline() {
    let shared = Shared::new();
    let app = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;

    let mut lone = app.connect("/ws/presence", 5).await;
    let mut observer = app.connect("/ws/presence?notifiers=5", 6).await;
    next_event(&mut observer).await;
    wait_until(|| app.hubs.presence.session_count() == 2).await;

    app.stop().await;

    // Cleanup has finished by the time the application returns.
    assert_eq!(shared.store.presence(5).map(|p| p.is_online), Some(false));
    assert_eq!(shared.store.presence(6).map(|p| p.is_online), Some(false));
    assert!(shared.cache.lrange(&keys::observing(6)).await.unwrap().is_empty());
    assert!(closed_by_server(&mut lone).await);
    assert!(closed_by_server(&mut observer).await);
}

#[tokio::test]
async fn test_abrupt_drop_across_processes() {
    let shared = Shared::new();
    let a = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;
    let b = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;

    let mut watcher = b.connect("/ws/presence?notifiers=1", 9).await;
    next_event(&mut watcher).await;

    let mut observer = a.connect("/ws/presence?notifiers=2,3", 1).await;
    let online = next_event(&mut watcher).await;
    assert_eq!(online["payload"]["user_id"], 1);
    assert_eq!(online["payload"]["is_online"], true);
    next_event(&mut observer).await;
    next_event(&mut observer).await;

    let _two = b.connect("/ws/presence", 2).await;
    let _three = a.connect("/ws/presence", 3).await;
    let mut seen = vec![
        next_event(&mut observer).await["payload"]["user_id"].as_i64().unwrap(),
        next_event(&mut observer).await["payload"]["user_id"].as_i64().unwrap(),
    ];
    seen.sort_unstable();
    assert_eq!(seen, vec![2, 3]);

    // No close frame: the socket just goes away.
    drop(observer);

    let offline = next_event(&mut watcher).await;
    assert_eq!(offline["payload"]["user_id"], 1);
    assert_eq!(offline["payload"]["is_online"], false);

    // Only the session of user 3 is left on the first process.
    wait_until(|| a.hubs.presence.session_count() == 1).await;
    assert_eq!(a.hubs.presence.registry().entry_count(), 0);
    assert_eq!(b.hubs.presence.registry().room_len(1), 1);
    assert_eq!(shared.store.presence(1).map(|p| p.is_online), Some(false));
    assert!(shared.cache.lrange(&keys::observing(1)).await.unwrap().is_empty());
    assert_eq!(shared.store.presence(2).map(|p| p.is_online), Some(true));
    assert_eq!(shared.store.presence(3).map(|p| p.is_online), Some(true));
}
