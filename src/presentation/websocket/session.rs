//! WebSocket Session Management
//!
//! One [`Session`] per open connection. Authentication and room
//! authorization happen before the upgrade (see `handler`); a session starts
//! in [`Phase::Authorized`] and moves through
//! `Joined -> Streaming -> Closing -> Closed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::client::{Client, Frame, Outbox};
use super::hub::Hub;
use super::presence::Presence;
use super::router::{Dispatch, EventContext};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Time allowed for the writer to flush its close frame.
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authenticated,
    Authorized,
    Joined,
    Streaming,
    Closing,
    Closed,
}

/// Who is connecting and to what, as established before the upgrade.
#[derive(Debug, Clone)]
pub struct Admission {
    pub user_id: i64,
    /// Conversation or whiteboard id; the user's own id for presence
    pub room_id: i64,
    /// Notifiers to observe right away (presence only)
    pub notifiers: Vec<i64>,
}

pub struct Session {
    hub: Arc<Hub>,
    presence: Option<Presence>,
    client: Client,
    phase: Mutex<Phase>,
    closed: AtomicBool,
}

impl Session {
    /// Register a new connection with its hub.
    ///
    /// Chat and whiteboard connections join their room. Presence connections
    /// go online and join the room of every requested notifier instead.
    pub async fn join(
        hub: Arc<Hub>,
        presence: Option<Presence>,
        admission: Admission,
        outbound_buffer: usize,
    ) -> (Self, Outbox) {
        let (client, outbox) = Client::new(admission.user_id, admission.room_id, outbound_buffer);

        let session = Self {
            hub,
            presence,
            client,
            phase: Mutex::new(Phase::Authorized),
            closed: AtomicBool::new(false),
        };

        session.hub.attach(&session.client);

        match &session.presence {
            Some(presence) => {
                presence.attach(admission.user_id);
                if let Err(e) = presence
                    .set_online_status(&session.hub, admission.user_id, true)
                    .await
                {
                    error!(user_id = admission.user_id, error = %e, "Failed to set user online");
                }
                presence
                    .subscribe(&session.hub, &session.client, &admission.notifiers)
                    .await;
            }
            None => {
                session
                    .hub
                    .registry()
                    .join(admission.room_id, session.client.clone());
            }
        }

        metrics::connection_opened(session.hub.kind());
        session.set_phase(Phase::Joined);
        info!(
            room_kind = %session.hub.kind(),
            room_id = admission.room_id,
            user_id = admission.user_id,
            connection_id = %session.client.connection_id,
            "Client joined"
        );

        (session, outbox)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock() = phase;
    }

    /// Deregister the connection. Only the first call has any effect.
    ///
    /// Returns `true` if this call performed the cleanup.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.set_phase(Phase::Closing);

        match &self.presence {
            Some(presence) => presence.unsubscribe(&self.hub, &self.client).await,
            None => {
                self.hub
                    .registry()
                    .remove(self.client.room_id, self.client.connection_id);
            }
        }

        self.hub.detach(self.client.connection_id);
        metrics::connection_closed(self.hub.kind());
        self.set_phase(Phase::Closed);
        info!(
            room_kind = %self.hub.kind(),
            room_id = self.client.room_id,
            user_id = self.client.user_id,
            connection_id = %self.client.connection_id,
            "Client disconnected"
        );
        true
    }

    /// Drive the connection until the client leaves, the transport fails,
    /// or the hub asks the connection to close.
    pub async fn run(self, socket: WebSocket, outbox: Outbox) {
        let (sink, mut stream) = socket.split();
        let Outbox { frames, closer } = outbox;

        let (stop_tx, stop_rx) = oneshot::channel();
        let writer = tokio::spawn(write_loop(sink, frames, stop_rx, closer.clone()));

        self.set_phase(Phase::Streaming);
        let ctx = EventContext {
            hub: &self.hub,
            client: &self.client,
        };
        let router = self.hub.router();
        let connection_id = self.client.connection_id;

        loop {
            tokio::select! {
                _ = closer.notified() => {
                    debug!(connection_id = %connection_id, "Close requested");
                    break;
                }
                msg = stream.next() => {
                    let outcome = match msg {
                        Some(Ok(Message::Text(text))) => router.dispatch_text(&ctx, text.as_str()).await,
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => router.dispatch_text(&ctx, text).await,
                            Err(e) => router.malformed(&ctx, None, &AppError::Protocol(e.to_string())),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(connection_id = %connection_id, "Connection closed by client");
                            break;
                        }
                        // Pong is handled automatically by axum
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                            break;
                        }
                    };
                    if outcome == Dispatch::Close {
                        break;
                    }
                }
            }
        }

        self.close().await;
        let _ = stop_tx.send(());
        if timeout(WRITER_GRACE, writer).await.is_err() {
            warn!(connection_id = %connection_id, "Writer did not stop in time");
        }
    }
}

/// Forward queued frames to the socket until stopped.
///
/// A failed write asks the session to close.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Frame>,
    mut stop: oneshot::Receiver<()>,
    closer: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
                        debug!(error = %e, "Failed to write frame");
                        closer.notify_one();
                        return;
                    }
                }
                None => break,
            },
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
