//! WebSocket Hub
//!
//! Real-time room fan-out over WebSocket connections.
//!
//! ```text
//! client --frame--> Session --> EventRouter --> Hub::publish --> Broker
//!                                                                  |
//! client <--frame-- Session writer <-- RoomRegistry::fanout <-- Hub subscriber
//! ```

pub mod bridge;
pub mod client;
pub mod events;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod presence;
pub mod registry;
pub mod router;
pub mod session;

pub use bridge::Bridge;
pub use client::{Client, Outbox};
pub use events::{chat_router, presence_router, whiteboard_router};
pub use handler::{chat_ws_handler, presence_ws_handler, whiteboard_ws_handler};
pub use hub::{Hub, Hubs};
pub use messages::{InboundFrame, PublishedMessage};
pub use presence::Presence;
pub use registry::{FanoutReport, JoinOutcome, RoomRegistry};
pub use router::{Dispatch, EventContext, EventHandler, EventRouter};
pub use session::{Admission, Phase, Session};
