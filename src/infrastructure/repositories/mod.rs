//! Repository Implementations
//!
//! Implementations of the domain persistence traits.
//!
//! - **PgChatRepository** - messages, conversations and membership
//! - **PgPresenceRepository** - online state on the users table
//! - **PgWhiteboardRepository** - whiteboard lookup
//! - **InMemoryStore** - all of the above in process memory
//!
//! ```rust,ignore
//! use chat_hub::infrastructure::repositories::{PgChatRepository, PgPresenceRepository};
//!
//! let chat = PgChatRepository::new(pool.clone());
//! let presence = PgPresenceRepository::new(pool);
//! ```

pub mod chat_repository;
pub mod memory;
pub mod presence_repository;
pub mod whiteboard_repository;

pub use chat_repository::PgChatRepository;
pub use memory::InMemoryStore;
pub use presence_repository::PgPresenceRepository;
pub use whiteboard_repository::PgWhiteboardRepository;
