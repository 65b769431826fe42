//! WebSocket Message Types
//!
//! Inbound frames, the broker/outbound envelope and the per-event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::domain::Point;

/// Event names
pub mod events {
    pub const SEND_MESSAGE: &str = "send_message";
    pub const SEEN_MESSAGE: &str = "seen_message";
    pub const IS_TYPING: &str = "is_typing";
    pub const UPDATE_WHITEBOARD: &str = "update_whiteboard";
    pub const NOTIFY: &str = "notify";
    pub const SUBSCRIBE: &str = "subscribe";
}

/// Frame sent by a client. The room is implied by the connection.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Canonical event relayed through the broker and delivered to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedMessage {
    pub event: String,
    #[serde(alias = "conversation_id")]
    pub room_id: i64,
    #[serde(default)]
    pub payload: Value,
}

impl PublishedMessage {
    pub fn new(event: &str, room_id: i64, payload: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.to_string(),
            room_id,
            payload: serde_json::to_value(payload)?,
        })
    }
}

// Chat payloads

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessagePayload {
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SeenMessagePayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub message_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct SeenMessageEvent {
    pub message_ids: Vec<i64>,
    pub seener_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct IsTypingPayload {
    pub is_typing: bool,
}

#[derive(Debug, Serialize)]
pub struct TypingEvent {
    pub user_id: i64,
    pub is_typing: bool,
}

// Whiteboard payloads

/// The only part of a drawing delta the hub looks at; every other field is
/// relayed untouched.
#[derive(Debug, Deserialize)]
pub struct WhiteboardDelta {
    #[serde(default)]
    pub points: Option<Vec<Point>>,
}

// Presence payloads

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribePayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub notifiers: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: i64,
    pub is_online: bool,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}
