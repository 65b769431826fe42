//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **JwtVerifier**: bearer token verification
//! - **ChatService**: room authorization and message persistence
//! - **PresenceService**: online state and observer subscriptions

pub mod auth_service;
pub mod chat_service;
pub mod presence_service;

pub use auth_service::{AuthError, Claims, JwtVerifier};
pub use chat_service::ChatService;
pub use presence_service::PresenceService;
