//! WebSocket Connection Handlers
//!
//! Upgrade endpoints, one per room kind. Authentication (the [`AuthUser`]
//! extractor) and room validation both run before the upgrade extractor is
//! looked at, so a rejected request never becomes a socket.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::session::{Admission, Phase, Session};
use crate::domain::RoomKind;
use crate::presentation::http::extractors::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, parse_id_list};
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhiteboardQuery {
    #[serde(rename = "whiteboardId")]
    pub whiteboard_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    /// Comma-separated notifier ids
    pub notifiers: Option<String>,
}

/// `GET /ws/chat?conversationId=<id>`
pub async fn chat_ws_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ChatQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let conversation_id = parse_id(query.conversation_id.as_deref())
        .ok_or_else(AppError::invalid_conversation_id)?;
    state
        .chat
        .authorize_conversation(user.user_id, conversation_id)
        .await?;

    let admission = Admission {
        user_id: user.user_id,
        room_id: conversation_id,
        notifiers: Vec::new(),
    };
    upgrade(ws?, &state, RoomKind::Chat, admission)
}

/// `GET /ws/whiteboard?whiteboardId=<id>`
pub async fn whiteboard_ws_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WhiteboardQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let whiteboard_id = parse_id(query.whiteboard_id.as_deref())
        .ok_or_else(AppError::invalid_whiteboard_id)?;
    state
        .chat
        .authorize_whiteboard(user.user_id, whiteboard_id)
        .await?;

    let admission = Admission {
        user_id: user.user_id,
        room_id: whiteboard_id,
        notifiers: Vec::new(),
    };
    upgrade(ws?, &state, RoomKind::Whiteboard, admission)
}

/// `GET /ws/presence?notifiers=<id,id,...>`
///
/// Without `notifiers` the connection only reports the user's own presence.
pub async fn presence_ws_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PresenceQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let notifiers = match query.notifiers.as_deref().map(str::trim) {
        None | Some("") => Vec::new(),
        Some(raw) => parse_id_list(raw).ok_or_else(AppError::invalid_notifiers)?,
    };

    let admission = Admission {
        user_id: user.user_id,
        room_id: user.user_id,
        notifiers,
    };
    upgrade(ws?, &state, RoomKind::Presence, admission)
}

impl From<WebSocketUpgradeRejection> for AppError {
    fn from(rejection: WebSocketUpgradeRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: &AppState,
    kind: RoomKind,
    admission: Admission,
) -> Result<Response, AppError> {
    debug!(
        room_kind = %kind,
        room_id = admission.room_id,
        user_id = admission.user_id,
        phase = ?Phase::Authorized,
        "Upgrading connection"
    );

    let hub = state.hubs.get(kind).clone();
    let presence = (kind == RoomKind::Presence).then(|| state.presence.clone());
    let outbound_buffer = state.settings.websocket.outbound_buffer;

    Ok(ws
        .max_message_size(state.settings.websocket.max_message_size)
        .on_failed_upgrade(move |e| warn!(room_kind = %kind, error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            let tracker = hub.clone();
            tracker.track(async move {
                let (session, outbox) = Session::join(hub, presence, admission, outbound_buffer).await;
                session.run(socket, outbox).await;
            })
        })
        .into_response())
}
