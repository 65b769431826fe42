//! Event handlers of each room kind.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::messages::{
    events, IsTypingPayload, PublishedMessage, SeenMessageEvent, SeenMessagePayload,
    SendMessagePayload, SubscribePayload, TypingEvent, WhiteboardDelta,
};
use super::presence::Presence;
use super::router::{decode, EventContext, EventHandler, EventRouter};
use crate::application::services::ChatService;
use crate::config::MalformedPayloadPolicy;
use crate::domain::RoomKind;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

/// Persist a chat message, then publish the stored message.
pub struct SendMessage {
    pub chat: Arc<ChatService>,
}

#[async_trait]
impl EventHandler for SendMessage {
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError> {
        let request: SendMessagePayload = decode(payload)?;
        validate(&request)?;

        let saved = self
            .chat
            .send_message(ctx.room_id(), ctx.user_id(), request.content)
            .await?;
        Ok(Some(PublishedMessage::new(events::SEND_MESSAGE, ctx.room_id(), saved)?))
    }
}

/// Mark a batch of messages as seen by the sender of the event.
pub struct SeenMessage {
    pub chat: Arc<ChatService>,
}

#[async_trait]
impl EventHandler for SeenMessage {
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError> {
        let request: SeenMessagePayload = decode(payload)?;
        validate(&request)?;

        self.chat
            .mark_seen(ctx.room_id(), &request.message_ids, ctx.user_id())
            .await?;
        let event = SeenMessageEvent {
            message_ids: request.message_ids,
            seener_id: ctx.user_id(),
        };
        Ok(Some(PublishedMessage::new(events::SEEN_MESSAGE, ctx.room_id(), event)?))
    }
}

/// Ephemeral typing indicator.
pub struct IsTyping;

#[async_trait]
impl EventHandler for IsTyping {
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError> {
        let request: IsTypingPayload = decode(payload)?;
        let event = TypingEvent {
            user_id: ctx.user_id(),
            is_typing: request.is_typing,
        };
        Ok(Some(PublishedMessage::new(events::IS_TYPING, ctx.room_id(), event)?))
    }
}

/// Relay a drawing delta to the whiteboard room. Last write wins.
pub struct UpdateWhiteboard;

#[async_trait]
impl EventHandler for UpdateWhiteboard {
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError> {
        let Value::Object(mut delta) = payload else {
            return Err(AppError::Protocol("whiteboard update must be an object".into()));
        };
        // Only checks that `points`, when present, is well formed.
        let _: WhiteboardDelta = decode(Value::Object(delta.clone()))?;

        delta.insert("drawer_user_id".into(), ctx.user_id().into());
        delta.insert("whiteboard_id".into(), ctx.room_id().into());
        Ok(Some(PublishedMessage {
            event: events::UPDATE_WHITEBOARD.to_string(),
            room_id: ctx.room_id(),
            payload: Value::Object(delta),
        }))
    }
}

/// Start observing more notifiers on an open presence connection.
pub struct Subscribe {
    pub presence: Presence,
}

#[async_trait]
impl EventHandler for Subscribe {
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError> {
        let request: SubscribePayload = decode(payload)?;
        validate(&request)?;

        self.presence
            .subscribe(ctx.hub, ctx.client, &request.notifiers)
            .await;
        Ok(None)
    }
}

pub fn chat_router(chat: Arc<ChatService>, policy: MalformedPayloadPolicy) -> EventRouter {
    EventRouter::new(RoomKind::Chat, policy)
        .route(events::SEND_MESSAGE, SendMessage { chat: chat.clone() })
        .route(events::SEEN_MESSAGE, SeenMessage { chat })
        .route(events::IS_TYPING, IsTyping)
}

pub fn whiteboard_router(policy: MalformedPayloadPolicy) -> EventRouter {
    EventRouter::new(RoomKind::Whiteboard, policy).route(events::UPDATE_WHITEBOARD, UpdateWhiteboard)
}

/// Online and offline events come from the connection lifecycle, so the
/// only client action is `subscribe`.
pub fn presence_router(presence: Presence, policy: MalformedPayloadPolicy) -> EventRouter {
    EventRouter::new(RoomKind::Presence, policy).route(events::SUBSCRIBE, Subscribe { presence })
}
