//! Message entity and chat repository trait.
//!
//! Maps to the `messages`, `conversations` and `conversation_members` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A persisted chat message.
///
/// This is the payload republished to every member of the conversation
/// after a successful `send_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
}

impl NewMessage {
    pub fn new(conversation_id: i64, sender_id: i64, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            sender_id,
            content: content.into(),
        }
    }
}

/// Persistence collaborator for chat rooms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Store a message and return it with its assigned id and timestamps.
    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Mark messages of `conversation_id` as seen by `seener_id`.
    ///
    /// Messages of other conversations, messages already seen and messages
    /// sent by the seener are left untouched. Returns the number of messages
    /// updated; updating none is an error.
    async fn mark_seen(
        &self,
        conversation_id: i64,
        message_ids: &[i64],
        seener_id: i64,
    ) -> Result<u64, AppError>;

    /// Check whether a conversation exists.
    async fn conversation_exists(&self, conversation_id: i64) -> Result<bool, AppError>;

    /// Check whether a user is a member of a conversation.
    async fn user_in_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<bool, AppError>;

    /// Round-trip to the store, used by readiness probes.
    async fn ping(&self) -> Result<(), AppError>;
}
