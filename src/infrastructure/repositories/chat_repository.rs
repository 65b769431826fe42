//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait over the
//! `messages`, `conversations` and `conversation_members` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ChatRepository, Message, NewMessage};
use crate::shared::error::AppError;

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender_id: i64,
    content: String,
    seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            content: self.content,
            seen_at: self.seen_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL chat repository.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, conversation_id, sender_id, content, seen_at, created_at, updated_at
            "#,
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    /// A sender can never mark their own messages as seen, and a message is
    /// seen at most once.
    async fn mark_seen(
        &self,
        conversation_id: i64,
        message_ids: &[i64],
        seener_id: i64,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET seen_at = NOW(), updated_at = NOW()
            WHERE id = ANY($1) AND seen_at IS NULL AND sender_id <> $2
              AND conversation_id = $3
            "#,
        )
        .bind(message_ids)
        .bind(seener_id)
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        match result.rows_affected() {
            0 => Err(AppError::Persistence("none of messages seen".into())),
            n => Ok(n),
        }
    }

    async fn conversation_exists(&self, conversation_id: i64) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn user_in_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM conversation_members
                WHERE conversation_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
