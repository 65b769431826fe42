//! Chat Room Tests
//!
//! Two apps sharing one broker and store stand in for two hub processes.

use std::time::Duration;

use chat_hub::config::MalformedPayloadPolicy;
use futures::SinkExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{
    closed_by_server, next_event, send_event, stays_quiet, wait_until, Shared, TestApp,
};

#[tokio::test]
async fn test_message_reaches_members_on_every_process_once() {
    let shared = Shared::new();
    shared.store.add_conversation(5, [1, 2]);
    let a = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;
    let b = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;

    let mut x = a.connect("/ws/chat?conversationId=5", 1).await;
    let mut y = b.connect("/ws/chat?conversationId=5", 2).await;
    wait_until(|| a.hubs.chat.registry().room_len(5) == 1).await;
    wait_until(|| b.hubs.chat.registry().room_len(5) == 1).await;

    send_event(&mut x, "send_message", json!({ "content": "hi" })).await;

    for ws in [&mut x, &mut y] {
        let event = next_event(ws).await;
        assert_eq!(event["event"], "send_message");
        assert_eq!(event["room_id"], 5);
        assert_eq!(event["payload"]["content"], "hi");
        assert_eq!(event["payload"]["sender_id"], 1);
        assert_eq!(event["payload"]["conversation_id"], 5);
        assert!(stays_quiet(ws, Duration::from_millis(200)).await);
    }

    let stored = shared.store.messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "hi");
}

#[tokio::test]
async fn test_typing_and_seen_are_broadcast() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1, 2]);
    let mut x = app.connect("/ws/chat?conversationId=5", 1).await;
    let mut y = app.connect("/ws/chat?conversationId=5", 2).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 2).await;

    send_event(&mut x, "send_message", json!({ "content": "hello" })).await;
    let sent = next_event(&mut y).await;
    next_event(&mut x).await;
    let message_id = sent["payload"]["id"].as_i64().unwrap();

    send_event(&mut y, "is_typing", json!({ "is_typing": true })).await;
    let typing = next_event(&mut x).await;
    assert_eq!(typing["event"], "is_typing");
    assert_eq!(typing["payload"], json!({ "user_id": 2, "is_typing": true }));
    next_event(&mut y).await;

    send_event(&mut y, "seen_message", json!({ "message_ids": [message_id] })).await;
    let seen = next_event(&mut x).await;
    assert_eq!(seen["event"], "seen_message");
    assert_eq!(
        seen["payload"],
        json!({ "message_ids": [message_id], "seener_id": 2 })
    );
    assert!(shared.store.messages()[0].seen_at.is_some());
}

#[tokio::test]
async fn test_seen_ignores_messages_of_other_conversations() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1, 2]);
    shared.store.add_conversation(6, [1, 3]);
    let mut x = app.connect("/ws/chat?conversationId=5", 1).await;
    let mut z = app.connect("/ws/chat?conversationId=6", 3).await;
    wait_until(|| app.hubs.chat.registry().size() == 2).await;

    send_event(&mut z, "send_message", json!({ "content": "private" })).await;
    let private_id = next_event(&mut z).await["payload"]["id"].as_i64().unwrap();

    send_event(&mut x, "seen_message", json!({ "message_ids": [private_id] })).await;

    assert!(stays_quiet(&mut x, Duration::from_millis(200)).await);
    assert!(stays_quiet(&mut z, Duration::from_millis(200)).await);
    assert!(shared.store.messages()[0].seen_at.is_none());
    assert_eq!(app.hubs.chat.registry().room_len(5), 1);
}

#[tokio::test]
async fn test_unknown_and_malformed_frames_keep_session_open_by_default() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1]);
    let mut x = app.connect("/ws/chat?conversationId=5", 1).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 1).await;

    x.send(Message::Text("not json".into())).await.unwrap();
    send_event(&mut x, "update_whiteboard", json!({})).await;
    send_event(&mut x, "send_message", json!({ "content": 42 })).await;
    send_event(&mut x, "send_message", json!({ "content": "" })).await;
    send_event(&mut x, "send_message", json!({ "content": "still here" })).await;

    let event = next_event(&mut x).await;
    assert_eq!(event["payload"]["content"], "still here");
    assert_eq!(shared.store.messages().len(), 1);
}

#[tokio::test]
async fn test_close_policy_ends_session_on_malformed_payload() {
    let shared = Shared::new();
    shared.store.add_conversation(5, [1]);
    let app = TestApp::spawn_with(&shared, MalformedPayloadPolicy::Close).await;
    let mut x = app.connect("/ws/chat?conversationId=5", 1).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 1).await;

    send_event(&mut x, "send_message", json!({ "content": 42 })).await;

    assert!(closed_by_server(&mut x).await);
    wait_until(|| app.hubs.chat.registry().entry_count() == 0).await;
}

#[tokio::test]
async fn test_second_connection_of_same_user_replaces_first() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1]);

    let mut first = app.connect("/ws/chat?conversationId=5", 1).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 1).await;
    let mut second = app.connect("/ws/chat?conversationId=5", 1).await;

    assert!(closed_by_server(&mut first).await);
    assert_eq!(app.hubs.chat.registry().room_len(5), 1);

    send_event(&mut second, "send_message", json!({ "content": "again" })).await;
    let event = next_event(&mut second).await;
    assert_eq!(event["payload"]["content"], "again");
}

#[tokio::test]
async fn test_disconnect_removes_client() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1, 2]);
    let x = app.connect("/ws/chat?conversationId=5", 1).await;
    let _y = app.connect("/ws/chat?conversationId=5", 2).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 2).await;

    drop(x);

    wait_until(|| app.hubs.chat.registry().room_len(5) == 1).await;
}
