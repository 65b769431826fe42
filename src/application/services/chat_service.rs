//! Chat Service
//!
//! Room authorization and message persistence for chat and whiteboard rooms.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{ChatRepository, Message, NewMessage, Whiteboard, WhiteboardRepository};
use crate::shared::error::AppError;

pub struct ChatService {
    chat: Arc<dyn ChatRepository>,
    whiteboards: Arc<dyn WhiteboardRepository>,
}

impl ChatService {
    pub fn new(chat: Arc<dyn ChatRepository>, whiteboards: Arc<dyn WhiteboardRepository>) -> Self {
        Self { chat, whiteboards }
    }

    /// Ensure the conversation exists and `user_id` is one of its members.
    #[instrument(skip(self))]
    pub async fn authorize_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<(), AppError> {
        if !self.chat.conversation_exists(conversation_id).await? {
            return Err(AppError::Validation("conversation not found".into()));
        }
        if !self.chat.user_in_conversation(user_id, conversation_id).await? {
            return Err(AppError::Validation(
                "user is not a member of this conversation".into(),
            ));
        }
        debug!("Conversation access granted");
        Ok(())
    }

    /// A whiteboard is open to the members of the conversation it belongs to.
    #[instrument(skip(self))]
    pub async fn authorize_whiteboard(
        &self,
        user_id: i64,
        whiteboard_id: i64,
    ) -> Result<Whiteboard, AppError> {
        let whiteboard = self
            .whiteboards
            .find_whiteboard(whiteboard_id)
            .await?
            .ok_or_else(|| AppError::Validation("whiteboard not found".into()))?;

        self.authorize_conversation(user_id, whiteboard.conversation_id)
            .await?;
        Ok(whiteboard)
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: String,
    ) -> Result<Message, AppError> {
        self.chat
            .save_message(NewMessage::new(conversation_id, sender_id, content))
            .await
    }

    /// Only messages of `conversation_id` can be marked.
    pub async fn mark_seen(
        &self,
        conversation_id: i64,
        message_ids: &[i64],
        seener_id: i64,
    ) -> Result<u64, AppError> {
        if message_ids.is_empty() {
            return Err(AppError::Validation("message not found".into()));
        }
        self.chat.mark_seen(conversation_id, message_ids, seener_id).await
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.chat.ping().await
    }
}
