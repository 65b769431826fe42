//! Connected clients and their outbound queues.

use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

/// A serialized outbound frame, shared by every recipient of a fan-out.
pub type Frame = Arc<str>;

/// Reasons a frame could not be queued for a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Full,
    #[error("connection closed")]
    Closed,
}

/// Handle to one open connection, as stored in a room registry.
///
/// Clones refer to the same connection; two handles are the same client
/// iff their `connection_id`s are equal.
#[derive(Debug, Clone)]
pub struct Client {
    pub connection_id: Uuid,
    pub user_id: i64,
    pub room_id: i64,
    outbound: mpsc::Sender<Frame>,
    closer: Arc<Notify>,
}

/// Receiving side of a client, owned by its session.
#[derive(Debug)]
pub struct Outbox {
    pub frames: mpsc::Receiver<Frame>,
    pub closer: Arc<Notify>,
}

impl Client {
    /// Create a client whose outbound queue holds at most `buffer` frames.
    pub fn new(user_id: i64, room_id: i64, buffer: usize) -> (Self, Outbox) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let closer = Arc::new(Notify::new());

        let client = Self {
            connection_id: Uuid::new_v4(),
            user_id,
            room_id,
            outbound: tx,
            closer: closer.clone(),
        };
        (client, Outbox { frames: rx, closer })
    }

    /// Queue a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Ask the owning session to terminate the connection.
    pub fn close(&self) {
        self.closer.notify_one();
    }

    pub fn is_same_connection(&self, other: &Client) -> bool {
        self.connection_id == other.connection_id
    }
}
