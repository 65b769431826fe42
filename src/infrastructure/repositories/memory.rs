//! In-memory store.
//!
//! Implements every persistence trait of the hub against process-local maps.
//! Used by the integration tests (one store shared by several application
//! instances) and for running the hub without PostgreSQL.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::{
    ChatRepository, Message, NewMessage, PresenceRecord, PresenceRepository, Whiteboard,
    WhiteboardRepository,
};
use crate::shared::error::AppError;

#[derive(Debug, Default)]
struct State {
    next_message_id: i64,
    messages: Vec<Message>,
    /// conversation id -> member user ids
    conversations: HashMap<i64, HashSet<i64>>,
    whiteboards: HashMap<i64, Whiteboard>,
    presence: HashMap<i64, PresenceRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation with the given members.
    pub fn add_conversation(&self, conversation_id: i64, members: impl IntoIterator<Item = i64>) {
        self.state
            .lock()
            .conversations
            .entry(conversation_id)
            .or_default()
            .extend(members);
    }

    /// Attach a whiteboard to an existing or future conversation.
    pub fn add_whiteboard(&self, whiteboard_id: i64, conversation_id: i64) {
        self.state.lock().whiteboards.insert(
            whiteboard_id,
            Whiteboard {
                id: whiteboard_id,
                conversation_id,
            },
        );
    }

    /// Snapshot of every stored message, in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn presence(&self, user_id: i64) -> Option<PresenceRecord> {
        self.state.lock().presence.get(&user_id).cloned()
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut state = self.state.lock();
        state.next_message_id += 1;

        let now = Utc::now();
        let saved = Message {
            id: state.next_message_id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            seen_at: None,
            created_at: now,
            updated_at: now,
        };
        state.messages.push(saved.clone());

        Ok(saved)
    }

    async fn mark_seen(
        &self,
        conversation_id: i64,
        message_ids: &[i64],
        seener_id: i64,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock();
        let now = Utc::now();

        let mut updated = 0;
        for message in state.messages.iter_mut().filter(|m| {
            m.conversation_id == conversation_id
                && message_ids.contains(&m.id)
                && m.seen_at.is_none()
                && m.sender_id != seener_id
        }) {
            message.seen_at = Some(now);
            message.updated_at = now;
            updated += 1;
        }

        match updated {
            0 => Err(AppError::Persistence("none of messages seen".into())),
            n => Ok(n),
        }
    }

    async fn conversation_exists(&self, conversation_id: i64) -> Result<bool, AppError> {
        Ok(self.state.lock().conversations.contains_key(&conversation_id))
    }

    async fn user_in_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .conversations
            .get(&conversation_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl PresenceRepository for InMemoryStore {
    async fn get_online_status(&self, user_id: i64) -> Result<PresenceRecord, AppError> {
        Ok(self.presence(user_id).unwrap_or(PresenceRecord {
            user_id,
            is_online: false,
            last_seen_at: None,
        }))
    }

    async fn set_online_status(
        &self,
        user_id: i64,
        is_online: bool,
    ) -> Result<PresenceRecord, AppError> {
        let record = PresenceRecord {
            user_id,
            is_online,
            last_seen_at: Some(Utc::now()),
        };
        self.state.lock().presence.insert(user_id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl WhiteboardRepository for InMemoryStore {
    async fn find_whiteboard(&self, whiteboard_id: i64) -> Result<Option<Whiteboard>, AppError> {
        Ok(self.state.lock().whiteboards.get(&whiteboard_id).cloned())
    }
}
