//! Upgrade Rejection Tests
//!
//! Requests that fail authentication or room validation are answered with
//! an HTTP error and never become sockets.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use test_case::test_case;

use tower::ServiceExt;

use crate::common::{body_json, TestApp};

#[test_case("/ws/chat?conversationId=abc", "invalid conversation id" ; "non numeric conversation")]
#[test_case("/ws/chat", "invalid conversation id" ; "missing conversation")]
#[test_case("/ws/chat?conversationId=0", "invalid conversation id" ; "zero conversation")]
#[test_case("/ws/whiteboard?whiteboardId=", "invalid whiteboard id" ; "empty whiteboard")]
#[test_case("/ws/presence?notifiers=1,x", "invalid notifiers" ; "bad notifier list")]
#[tokio::test]
async fn test_malformed_room_is_bad_request(uri: &str, message: &str) {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get_auth(uri, 1).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], message);
}

#[test_case("/ws/chat?conversationId=5" ; "chat")]
#[test_case("/ws/presence" ; "presence")]
#[test_case("/ws/whiteboard?whiteboardId=9" ; "whiteboard")]
#[tokio::test]
async fn test_missing_token_is_unauthorized(uri: &str) {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get(uri).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let (app, _shared) = TestApp::spawn().await;
    let claims = chat_hub::application::services::Claims {
        id: 1,
        email: "user1@example.com".into(),
        first_name: String::new(),
        last_name: String::new(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"some-other-secret-of-sufficient-length"),
    )
    .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/ws/presence")
                .header("Authorization", format!("Bearer {}", forged))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_member_is_rejected() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1, 2]);

    let response = app.get_auth("/ws/chat?conversationId=5", 3).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "user is not a member of this conversation");
}

#[tokio::test]
async fn test_unknown_whiteboard_is_rejected() {
    let (app, _shared) = TestApp::spawn().await;

    let response = app.get_auth("/ws/whiteboard?whiteboardId=9", 1).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "whiteboard not found");
}

#[tokio::test]
async fn test_valid_request_without_upgrade_headers_is_rejected() {
    let (app, shared) = TestApp::spawn().await;
    shared.store.add_conversation(5, [1]);

    let response = app.get_auth("/ws/chat?conversationId=5", 1).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.hubs.chat.registry().entry_count(), 0);
}
