//! # Domain Layer
//!
//! Core types of the messaging hub, independent of transport and storage.
//!
//! ## Structure
//!
//! - **entities**: Messages, presence records, whiteboards and the repository
//!   traits through which the hub reaches the persistence collaborator
//! - **room**: The three room kinds
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts

pub mod entities;
pub mod room;

// Re-export commonly used types
pub use entities::*;
pub use room::*;
