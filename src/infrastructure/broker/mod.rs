//! Broker Module
//!
//! Publish/subscribe transport that relays hub events between server
//! processes. Every process publishes canonical events to a channel and every
//! process (including the publisher) receives them back through its own
//! subscription, so local fan-out is always driven by the broker.
//!
//! - `RedisBroker`: Redis `PUBLISH` / `SUBSCRIBE`
//! - `MemoryBroker`: one `tokio::sync::broadcast` channel per topic; share a
//!   single instance between several hubs to emulate several processes

mod memory_broker;
mod redis_broker;

pub use memory_broker::MemoryBroker;
pub use redis_broker::RedisBroker;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::shared::error::AppError;

/// Stream of raw payloads received on one channel.
pub type MessageStream = BoxStream<'static, String>;

/// Cross-process publish/subscribe transport.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a payload to every subscriber of `channel`.
    async fn publish(&self, channel: &str, payload: String) -> Result<(), AppError>;

    /// Open a long-lived subscription to `channel`.
    ///
    /// The subscription is established before this returns; the stream ends
    /// only when the underlying connection is lost.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, AppError>;
}
