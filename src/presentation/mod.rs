//! Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket hubs.

pub mod http;
pub mod websocket;
pub mod middleware;
