//! # Chat Hub Library
//!
//! Real-time multi-room messaging hub. Clients hold WebSocket sessions in
//! one of three room kinds (chat conversations, presence observation and
//! whiteboards); every event is published to a Redis channel and fanned out
//! to the local members of its room by each process when it comes back.
//!
//! ## Architecture
//!
//! - **Domain Layer**: Room kinds, entities and repository traits
//! - **Application Layer**: Token verification, chat and presence services
//! - **Infrastructure Layer**: Postgres repositories, Redis cache and broker
//! - **Presentation Layer**: Upgrade handlers, sessions, registries and hubs
//!
//! ## Module Structure
//!
//! ```text
//! chat_hub/
//! +-- config/         Configuration management
//! +-- domain/         Room kinds, entities and repository traits
//! +-- application/    Application services
//! +-- infrastructure/ Database, cache, broker and metrics
//! +-- presentation/   HTTP routes and WebSocket hubs
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
