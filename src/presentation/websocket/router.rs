//! Event Router
//!
//! Per room kind table of event name to handler. The router owns the
//! error policy for inbound events:
//!
//! | failure                         | effect                                   |
//! |---------------------------------|------------------------------------------|
//! | unknown event                   | logged, ignored                          |
//! | malformed frame or payload      | `MalformedPayloadPolicy` (drop or close) |
//! | persistence or other failure    | logged, nothing published, stays open    |
//!
//! A handler returns the canonical event to publish; the router publishes it
//! only when the handler succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::client::Client;
use super::hub::Hub;
use super::messages::{InboundFrame, PublishedMessage};
use crate::config::MalformedPayloadPolicy;
use crate::domain::RoomKind;
use crate::shared::error::AppError;

/// What a handler sees of the connection that sent the event.
pub struct EventContext<'a> {
    pub hub: &'a Hub,
    pub client: &'a Client,
}

impl EventContext<'_> {
    pub fn user_id(&self) -> i64 {
        self.client.user_id
    }

    pub fn room_id(&self) -> i64 {
        self.client.room_id
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. `Ok(Some(_))` is published to the room.
    async fn handle(
        &self,
        ctx: &EventContext<'_>,
        payload: Value,
    ) -> Result<Option<PublishedMessage>, AppError>;
}

/// Outcome of dispatching one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler succeeded and its event was published.
    Published,
    /// The handler succeeded without anything to publish.
    Handled,
    /// No handler for this event name.
    Ignored,
    /// Malformed input dropped under `MalformedPayloadPolicy::Drop`.
    Dropped,
    /// The handler failed; nothing was published.
    Failed,
    /// The session must end.
    Close,
}

/// Decode an event payload, reporting failures as protocol errors.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload).map_err(|e| AppError::Protocol(e.to_string()))
}

pub struct EventRouter {
    kind: RoomKind,
    handlers: HashMap<&'static str, Arc<dyn EventHandler>>,
    policy: MalformedPayloadPolicy,
}

impl EventRouter {
    pub fn new(kind: RoomKind, policy: MalformedPayloadPolicy) -> Self {
        Self {
            kind,
            handlers: HashMap::new(),
            policy,
        }
    }

    pub fn route(mut self, event: &'static str, handler: impl EventHandler + 'static) -> Self {
        self.handlers.insert(event, Arc::new(handler));
        self
    }

    /// Decode and dispatch a text frame.
    pub async fn dispatch_text(&self, ctx: &EventContext<'_>, text: &str) -> Dispatch {
        match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => self.dispatch(ctx, frame).await,
            Err(e) => self.malformed(ctx, None, &AppError::Protocol(e.to_string())),
        }
    }

    pub async fn dispatch(&self, ctx: &EventContext<'_>, frame: InboundFrame) -> Dispatch {
        let Some(handler) = self.handlers.get(frame.event.as_str()) else {
            debug!(
                room_kind = %self.kind,
                room_id = ctx.room_id(),
                user_id = ctx.user_id(),
                event = %frame.event,
                "Ignoring unknown event"
            );
            return Dispatch::Ignored;
        };

        match handler.handle(ctx, frame.payload).await {
            Ok(Some(message)) => {
                ctx.hub.publish(&message).await;
                Dispatch::Published
            }
            Ok(None) => Dispatch::Handled,
            Err(e @ (AppError::Protocol(_) | AppError::Validation(_))) => {
                self.malformed(ctx, Some(&frame.event), &e)
            }
            Err(e) => {
                error!(
                    room_kind = %self.kind,
                    room_id = ctx.room_id(),
                    user_id = ctx.user_id(),
                    event = %frame.event,
                    error = %e,
                    "Event handler failed"
                );
                Dispatch::Failed
            }
        }
    }

    /// Apply the malformed payload policy.
    pub fn malformed(&self, ctx: &EventContext<'_>, event: Option<&str>, err: &AppError) -> Dispatch {
        warn!(
            room_kind = %self.kind,
            room_id = ctx.room_id(),
            user_id = ctx.user_id(),
            event = event.unwrap_or("<undecodable>"),
            error = %err,
            policy = ?self.policy,
            "Malformed inbound frame"
        );
        match self.policy {
            MalformedPayloadPolicy::Drop => Dispatch::Dropped,
            MalformedPayloadPolicy::Close => Dispatch::Close,
        }
    }
}
