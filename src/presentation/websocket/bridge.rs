//! Broker Bridge
//!
//! Connects one hub to its broker channel. Every event a hub emits is
//! published here and only reaches local clients once it comes back through
//! the subscription, so all processes deliver the same events.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, error, warn};

use super::messages::PublishedMessage;
use crate::domain::RoomKind;
use crate::infrastructure::broker::Broker;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// A decoded broker message together with its raw text.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub message: PublishedMessage,
    pub raw: String,
}

pub struct Bridge {
    kind: RoomKind,
    broker: Arc<dyn Broker>,
    channel: String,
}

impl Bridge {
    pub fn new(kind: RoomKind, broker: Arc<dyn Broker>, channel: impl Into<String>) -> Self {
        Self {
            kind,
            broker,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish an event. Failures are logged and the event is lost.
    pub async fn publish(&self, message: &PublishedMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!(room_kind = %self.kind, event = %message.event, error = %e, "Failed to encode event");
                return;
            }
        };

        match self.broker.publish(&self.channel, payload).await {
            Ok(()) => {
                metrics::record_publish(self.kind, &message.event);
                debug!(
                    room_kind = %self.kind,
                    room_id = message.room_id,
                    event = %message.event,
                    "Event published"
                );
            }
            Err(e) => {
                error!(
                    room_kind = %self.kind,
                    room_id = message.room_id,
                    event = %message.event,
                    error = %e,
                    "Failed to publish event"
                );
            }
        }
    }

    /// Subscribe to the channel. Undecodable messages are skipped.
    pub async fn subscribe(&self) -> Result<impl Stream<Item = Relayed> + Send + 'static, AppError> {
        let stream = self.broker.subscribe(&self.channel).await?;
        let kind = self.kind;

        Ok(stream.filter_map(move |raw| {
            let decoded = serde_json::from_str::<PublishedMessage>(&raw);
            async move {
                match decoded {
                    Ok(message) => Some(Relayed { message, raw }),
                    Err(e) => {
                        warn!(room_kind = %kind, error = %e, "Skipping undecodable broker message");
                        None
                    }
                }
            }
        }))
    }
}
