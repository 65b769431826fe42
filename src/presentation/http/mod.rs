//! HTTP Layer
//!
//! Routes, extractors and plain HTTP handlers.

pub mod extractors;
pub mod handlers;
pub mod routes;
