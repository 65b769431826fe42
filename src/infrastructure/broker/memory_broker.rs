//! In-process broker.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::warn;

use super::{Broker, MessageStream};
use crate::shared::error::AppError;

/// Capacity of each topic. Subscribers that fall further behind skip
/// messages, matching the at-most-once delivery of Redis pub/sub.
const TOPIC_CAPACITY: usize = 1024;

/// Broadcast-channel broker living inside one process.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    topics: DashMap<String, broadcast::Sender<String>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, channel: &str) -> broadcast::Sender<String> {
        self.topics
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), AppError> {
        // No subscribers is not an error, Redis reports zero receivers too.
        let _ = self.topic(channel).send(payload);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, AppError> {
        let rx = self.topic(channel).subscribe();
        let channel = channel.to_string();

        let stream = futures::stream::unfold(rx, move |mut rx| {
            let channel = channel.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => return Some((payload, rx)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped = skipped, "Broker subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
