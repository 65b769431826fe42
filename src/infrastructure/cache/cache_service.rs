//! Cache Service
//!
//! Cache trait and its Redis and in-memory implementations.
//!
//! This module provides:
//! - A `Cache` trait defining the string and list operations the hub needs
//! - A `RedisCache` implementation using Redis as the backing store
//! - A `MemoryCache` implementation with passive TTL expiry, used in tests
//!   and single-process development runs
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_hub::infrastructure::cache::{Cache, RedisCache};
//!
//! let cache = RedisCache::new(redis_connection);
//!
//! cache.set_ex("presence:online:7", "true", 86_400).await?;
//! let online = cache.get("presence:online:7").await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::shared::error::AppError;

/// Cache operations used by the presence adapter.
///
/// Values are plain strings; callers own their encoding. The trait is
/// object safe so backends can be swapped behind an `Arc<dyn Cache>`.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves a string value, `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Stores a string value with an expiration time in seconds.
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), AppError>;

    /// Appends a value to the list stored at `key`, creating it if absent.
    ///
    /// Returns the length of the list after the push.
    async fn rpush(&self, key: &str, value: &str) -> Result<u64, AppError>;

    /// Returns every element of the list stored at `key`.
    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError>;

    /// Deletes a key of any type.
    ///
    /// # Returns
    /// * `Ok(true)` - If the key existed and was deleted
    /// * `Ok(false)` - If the key did not exist
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Round-trip to the backend, used by readiness probes.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Redis-backed cache implementation.
///
/// Uses `ConnectionManager` for automatic reconnection. Cloning is cheap
/// as the manager is internally reference-counted.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Cache for RedisCache {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(key).await?;
        debug!(key = %key, hit = result.is_some(), "Cache get");

        Ok(result)
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();

        let _: () = conn.set_ex(key, value, seconds).await?;
        debug!(key = %key, ttl = seconds, "Cache set with expiry");

        Ok(())
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn rpush(&self, key: &str, value: &str) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();

        let len: u64 = conn.rpush(key, value).await?;
        debug!(key = %key, len = len, "Cache list push");

        Ok(len)
    }

    #[instrument(skip(self), level = "debug")]
    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn.clone();

        let values: Vec<String> = conn.lrange(key, 0, -1).await?;
        debug!(key = %key, count = values.len(), "Cache list range");

        Ok(values)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        let deleted: u64 = conn.del(key).await?;
        let existed = deleted > 0;
        debug!(key = %key, deleted = existed, "Cache delete");

        Ok(existed)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum MemoryValue {
    Str(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: MemoryValue,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local cache with Redis-like semantics.
///
/// Expired entries are dropped lazily on access. Time is read from
/// `tokio::time`, so expiry can be driven by a paused test clock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `key` if it has expired, then run `f` on the live entry map.
    fn with_live<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, MemoryEntry>) -> R) -> R {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        f(&mut entries)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.with_live(key, |entries| match entries.get(key) {
            Some(MemoryEntry {
                value: MemoryValue::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(AppError::Internal(format!(
                "WRONGTYPE key {} does not hold a string",
                key
            ))),
            None => Ok(None),
        })
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), AppError> {
        let expires_at = Instant::now() + Duration::from_secs(seconds);
        self.entries.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: MemoryValue::Str(value.to_string()),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64, AppError> {
        self.with_live(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| MemoryEntry {
                value: MemoryValue::List(Vec::new()),
                expires_at: None,
            });
            match &mut entry.value {
                MemoryValue::List(list) => {
                    list.push(value.to_string());
                    Ok(list.len() as u64)
                }
                MemoryValue::Str(_) => Err(AppError::Internal(format!(
                    "WRONGTYPE key {} does not hold a list",
                    key
                ))),
            }
        })
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError> {
        self.with_live(key, |entries| match entries.get(key) {
            Some(MemoryEntry {
                value: MemoryValue::List(list),
                ..
            }) => Ok(list.clone()),
            Some(_) => Err(AppError::Internal(format!(
                "WRONGTYPE key {} does not hold a list",
                key
            ))),
            None => Ok(Vec::new()),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.with_live(key, |entries| entries.remove(key).is_some()))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
