//! Presence Repository Implementation
//!
//! Online state is stored on the `users` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{PresenceRecord, PresenceRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PresenceRow {
    id: i64,
    is_online: bool,
    last_seen_at: Option<DateTime<Utc>>,
}

impl PresenceRow {
    fn into_record(self) -> PresenceRecord {
        PresenceRecord {
            user_id: self.id,
            is_online: self.is_online,
            last_seen_at: self.last_seen_at,
        }
    }
}

/// PostgreSQL presence repository.
#[derive(Clone)]
pub struct PgPresenceRepository {
    pool: PgPool,
}

impl PgPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    async fn get_online_status(&self, user_id: i64) -> Result<PresenceRecord, AppError> {
        let row = sqlx::query_as::<_, PresenceRow>(
            "SELECT id, is_online, last_seen_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Persistence(format!("user {} not found", user_id)))?;

        Ok(row.into_record())
    }

    async fn set_online_status(
        &self,
        user_id: i64,
        is_online: bool,
    ) -> Result<PresenceRecord, AppError> {
        let row = sqlx::query_as::<_, PresenceRow>(
            r#"
            UPDATE users
            SET is_online = $2, last_seen_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, is_online, last_seen_at
            "#,
        )
        .bind(user_id)
        .bind(is_online)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Persistence(format!("user {} not found", user_id)))?;

        Ok(row.into_record())
    }
}
