//! Whiteboard Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Whiteboard, WhiteboardRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct WhiteboardRow {
    id: i64,
    conversation_id: i64,
}

/// PostgreSQL whiteboard repository.
#[derive(Clone)]
pub struct PgWhiteboardRepository {
    pool: PgPool,
}

impl PgWhiteboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WhiteboardRepository for PgWhiteboardRepository {
    async fn find_whiteboard(&self, whiteboard_id: i64) -> Result<Option<Whiteboard>, AppError> {
        let row = sqlx::query_as::<_, WhiteboardRow>(
            "SELECT id, conversation_id FROM whiteboards WHERE id = $1",
        )
        .bind(whiteboard_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Whiteboard {
            id: r.id,
            conversation_id: r.conversation_id,
        }))
    }
}
