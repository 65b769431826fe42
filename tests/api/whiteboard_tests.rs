//! Whiteboard Room Tests

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{next_event, send_event, wait_until, TestApp};

#[tokio::test]
async fn test_delta_is_relayed_with_drawer_and_board() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(3, [1, 2]);
    shared.store.add_whiteboard(9, 3);

    let mut drawer = app.connect("/ws/whiteboard?whiteboardId=9", 1).await;
    let mut viewer = app.connect("/ws/whiteboard?whiteboardId=9", 2).await;
    wait_until(|| app.hubs.whiteboard.registry().room_len(9) == 2).await;

    send_event(
        &mut drawer,
        "update_whiteboard",
        json!({ "points": [{ "x": 1.0, "y": 2.0 }], "color": "red" }),
    )
    .await;

    let event = next_event(&mut viewer).await;
    assert_eq!(event["event"], "update_whiteboard");
    assert_eq!(event["room_id"], 9);
    assert_eq!(event["payload"]["drawer_user_id"], 1);
    assert_eq!(event["payload"]["whiteboard_id"], 9);
    assert_eq!(event["payload"]["color"], "red");
    assert_eq!(event["payload"]["points"][0]["y"], 2.0);
}

#[tokio::test]
async fn test_registry_is_empty_after_everyone_leaves() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(3, [1, 2]);
    shared.store.add_whiteboard(9, 3);

    let drawer = app.connect("/ws/whiteboard?whiteboardId=9", 1).await;
    let viewer = app.connect("/ws/whiteboard?whiteboardId=9", 2).await;
    wait_until(|| app.hubs.whiteboard.registry().room_len(9) == 2).await;

    drop(drawer);
    drop(viewer);

    wait_until(|| app.hubs.whiteboard.registry().size() == 0).await;
    assert_eq!(app.hubs.whiteboard.registry().entry_count(), 0);
}

#[tokio::test]
async fn test_member_of_other_conversation_cannot_join() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(3, [1]);
    shared.store.add_conversation(4, [2]);
    shared.store.add_whiteboard(9, 3);

    let response = app.get_auth("/ws/whiteboard?whiteboardId=9", 2).await;

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
