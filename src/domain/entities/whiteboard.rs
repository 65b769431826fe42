//! Whiteboard entity and repository trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A shared drawing surface attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whiteboard {
    pub id: i64,
    pub conversation_id: i64,
}

/// A single point of a drawing stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[async_trait]
pub trait WhiteboardRepository: Send + Sync {
    /// Find a whiteboard by id.
    async fn find_whiteboard(&self, whiteboard_id: i64) -> Result<Option<Whiteboard>, AppError>;
}
