//! Presence record and repository trait.
//!
//! Online state lives on the `users` table (`is_online`, `last_seen_at`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A user's online state as observed by other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: i64,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Source of truth for presence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Read the stored online state of a user.
    async fn get_online_status(&self, user_id: i64) -> Result<PresenceRecord, AppError>;

    /// Store a new online state; `last_seen_at` is set to now.
    async fn set_online_status(
        &self,
        user_id: i64,
        is_online: bool,
    ) -> Result<PresenceRecord, AppError>;
}
