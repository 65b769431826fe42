//! Cache Module
//!
//! Redis connection management and caching utilities.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A `Cache` trait for abstracting cache operations
//! - `RedisCache` and `MemoryCache` implementations
//! - Predefined key builders for consistent cache key naming
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! | PresenceService   |
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! |   Cache Trait     |  <-- Abstract interface
//! +-------------------+
//!          |
//!          v
//! +-------------------+     +-------------+
//! |   RedisCache      |     | MemoryCache |
//! +-------------------+     +-------------+
//!          |
//!          v
//! +-------------------+
//! | ConnectionManager |
//! +-------------------+
//! ```

mod cache_service;

pub use cache_service::{Cache, MemoryCache, RedisCache};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key builders.
///
/// Use these to ensure consistent key naming across the application.
///
/// ```rust,ignore
/// use chat_hub::infrastructure::cache::keys;
///
/// let key = keys::online_status(user_id); // "presence:online:42"
/// ```
pub mod keys {
    /// Prefix for the cached online flag (TTL bound)
    pub const ONLINE_STATUS: &str = "presence:online:";

    /// Prefix for the cached last-seen timestamp (TTL bound)
    pub const LAST_SEEN: &str = "presence:last_seen:";

    /// Prefix for an observer's list of subscribed notifier ids (no TTL)
    pub const OBSERVING: &str = "presence:observing:";

    #[inline]
    pub fn online_status(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", ONLINE_STATUS, user_id)
    }

    #[inline]
    pub fn last_seen(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", LAST_SEEN, user_id)
    }

    #[inline]
    pub fn observing(observer_id: impl std::fmt::Display) -> String {
        format!("{}{}", OBSERVING, observer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::keys;

    #[test]
    fn test_key_builders() {
        assert_eq!(keys::online_status(7), "presence:online:7");
        assert_eq!(keys::last_seen(7), "presence:last_seen:7");
        assert_eq!(keys::observing(3), "presence:observing:3");
    }
}
