//! Room kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three logical room families served by the hub.
///
/// Each kind has its own event vocabulary, its own broker channel and its
/// own registry; events of different kinds are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// A chat conversation, keyed by conversation id
    Chat,
    /// Presence observation, keyed by the observed (notifier) user id
    Presence,
    /// A whiteboard session, keyed by whiteboard id
    Whiteboard,
}

impl RoomKind {
    pub const ALL: [RoomKind; 3] = [RoomKind::Chat, RoomKind::Presence, RoomKind::Whiteboard];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Chat => "chat",
            RoomKind::Presence => "presence",
            RoomKind::Whiteboard => "whiteboard",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
