//! # Domain Entities
//!
//! Entities exchanged with the persistence collaborator.
//!
//! - **Message**: A chat message stored in a conversation
//! - **PresenceRecord**: A user's online flag and last-seen timestamp
//! - **Whiteboard**: A drawing surface belonging to a conversation
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining the narrow contract
//! the hub consumes. These traits are implemented in the infrastructure layer,
//! following the dependency inversion principle.

mod message;
mod presence;
mod whiteboard;

pub use message::{ChatRepository, Message, NewMessage};
pub use presence::{PresenceRecord, PresenceRepository};
pub use whiteboard::{Point, Whiteboard, WhiteboardRepository};

#[cfg(test)]
pub use message::MockChatRepository;
#[cfg(test)]
pub use presence::MockPresenceRepository;
