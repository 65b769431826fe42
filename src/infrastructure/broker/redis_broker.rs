//! Redis pub/sub broker.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info, instrument, warn};

use super::{Broker, MessageStream};
use crate::config::RedisSettings;
use crate::shared::error::AppError;

/// Redis-backed broker.
///
/// Publishing goes through the shared `ConnectionManager`; every subscription
/// opens its own dedicated pub/sub connection, as Redis requires.
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
    conn: ConnectionManager,
}

impl RedisBroker {
    pub fn new(client: Client, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }

    /// Connect using the application's Redis settings.
    #[instrument(skip(settings), fields(url = %settings.url))]
    pub async fn connect(settings: &RedisSettings) -> Result<Self, AppError> {
        let client = Client::open(settings.url.as_str())?;
        let conn = ConnectionManager::new(client.clone()).await?;
        info!("Redis broker connected");
        Ok(Self::new(client, conn))
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| AppError::Broker(format!("publish to {} failed: {}", channel, e)))?;
        debug!(channel = %channel, receivers = receivers, "Published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, AppError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::Broker(format!("pubsub connection failed: {}", e)))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| AppError::Broker(format!("subscribe to {} failed: {}", channel, e)))?;
        info!(channel = %channel, "Subscribed to Redis channel");

        let channel = channel.to_string();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let payload = msg.get_payload::<String>();
            let channel = channel.clone();
            async move {
                match payload {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "Dropping non-text broker message");
                        None
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker").finish_non_exhaustive()
    }
}
