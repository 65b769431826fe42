//! Infrastructure Layer
//!
//! Implementations for external services:
//! - Database repositories (PostgreSQL, plus an in-memory store)
//! - Cache implementations (Redis, in-memory)
//! - Pub/sub brokers (Redis, in-memory)
//! - Prometheus metrics

pub mod broker;
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
