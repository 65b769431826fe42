//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::{body_json, wait_until, TestApp};

#[tokio::test]
async fn test_health_check_returns_ok() {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe() {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_collaborators_and_connections() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1]);
    let _ws = app.connect("/ws/chat?conversationId=5", 1).await;
    let _lone = app.connect("/ws/presence", 2).await;
    wait_until(|| app.hubs.chat.registry().room_len(5) == 1).await;
    wait_until(|| app.hubs.presence.session_count() == 1).await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"]["status"], "healthy");
    assert_eq!(body["checks"]["cache"]["status"], "healthy");
    assert_eq!(
        body["rooms"]["chat"],
        serde_json::json!({ "rooms": 1, "connections": 1, "sessions": 1 })
    );
    // A presence session that observes nobody is in no room.
    assert_eq!(
        body["rooms"]["presence"],
        serde_json::json!({ "rooms": 0, "connections": 0, "sessions": 1 })
    );
    assert_eq!(body["rooms"]["whiteboard"]["sessions"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_is_prometheus_text() {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}
