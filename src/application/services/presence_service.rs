//! Presence Service
//!
//! Online state and observer subscriptions.
//!
//! The persistence store is the source of truth for online state; the cache
//! holds a copy of the latest status and last-seen time for `status_ttl`.
//! Observer subscription lists live only in the cache and have no expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::{PresenceRecord, PresenceRepository};
use crate::infrastructure::cache::{keys, Cache};
use crate::shared::error::AppError;

pub struct PresenceService {
    repository: Arc<dyn PresenceRepository>,
    cache: Arc<dyn Cache>,
    status_ttl: Duration,
}

impl PresenceService {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        cache: Arc<dyn Cache>,
        status_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            status_ttl,
        }
    }

    /// Write the new state through to the store, then refresh the cache.
    ///
    /// Concurrent calls for the same user are not serialized; the last
    /// writer wins in both the store and the cache.
    #[instrument(skip(self))]
    pub async fn set_online_status(
        &self,
        user_id: i64,
        is_online: bool,
    ) -> Result<PresenceRecord, AppError> {
        let record = self.repository.set_online_status(user_id, is_online).await?;
        let ttl = self.status_ttl.as_secs();

        self.cache
            .set_ex(&keys::online_status(user_id), &is_online.to_string(), ttl)
            .await?;
        if let Some(last_seen) = record.last_seen_at {
            self.cache
                .set_ex(&keys::last_seen(user_id), &last_seen.to_rfc3339(), ttl)
                .await?;
        }

        debug!(is_online = is_online, "Presence updated");
        Ok(record)
    }

    /// Cached state of a user, `None` once the entry has expired.
    pub async fn cached_status(&self, user_id: i64) -> Result<Option<PresenceRecord>, AppError> {
        let Some(status) = self.cache.get(&keys::online_status(user_id)).await? else {
            return Ok(None);
        };

        let last_seen_at = self
            .cache
            .get(&keys::last_seen(user_id))
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(Some(PresenceRecord {
            user_id,
            is_online: status == "true",
            last_seen_at,
        }))
    }

    /// Cached state, falling back to the store on a miss.
    pub async fn status(&self, user_id: i64) -> Result<PresenceRecord, AppError> {
        match self.cached_status(user_id).await? {
            Some(record) => Ok(record),
            None => self.repository.get_online_status(user_id).await,
        }
    }

    /// Record that `observer_id` watches `notifier_id`.
    pub async fn add_subscription(&self, observer_id: i64, notifier_id: i64) -> Result<(), AppError> {
        self.cache
            .rpush(&keys::observing(observer_id), &notifier_id.to_string())
            .await?;
        Ok(())
    }

    /// Every notifier id recorded for `observer_id`, duplicates removed.
    pub async fn subscriptions(&self, observer_id: i64) -> Result<Vec<i64>, AppError> {
        let mut notifiers: Vec<i64> = self
            .cache
            .lrange(&keys::observing(observer_id))
            .await?
            .iter()
            .filter_map(|raw| raw.parse().ok())
            .collect();
        notifiers.sort_unstable();
        notifiers.dedup();
        Ok(notifiers)
    }

    pub async fn clear_subscriptions(&self, observer_id: i64) -> Result<(), AppError> {
        self.cache.delete(&keys::observing(observer_id)).await?;
        Ok(())
    }
}
