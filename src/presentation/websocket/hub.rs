//! Room hubs
//!
//! A [`Hub`] serves one room kind: it owns the kind's registry, its broker
//! bridge and its event router. All three room kinds share this type; only
//! the router table and broker channel differ.
//!
//! A hub also tracks every open session of its kind, whether or not the
//! session is listed in any room, so that shutdown can close them all and
//! wait for their cleanup.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::bridge::{Bridge, Relayed};
use super::client::{Client, Frame};
use super::messages::PublishedMessage;
use super::registry::{FanoutReport, RoomRegistry};
use super::router::EventRouter;
use crate::domain::RoomKind;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

pub struct Hub {
    kind: RoomKind,
    registry: RoomRegistry,
    bridge: Bridge,
    router: EventRouter,
    sessions: DashMap<Uuid, Client>,
    tasks: TaskTracker,
    closing: AtomicBool,
}

impl Hub {
    pub fn new(kind: RoomKind, bridge: Bridge, router: EventRouter) -> Self {
        Self {
            kind,
            registry: RoomRegistry::new(kind),
            bridge,
            router,
            sessions: DashMap::new(),
            tasks: TaskTracker::new(),
            closing: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Record an open session. Once the hub is closing the session is told
    /// to close right away.
    pub fn attach(&self, client: &Client) {
        self.sessions.insert(client.connection_id, client.clone());
        if self.closing.load(Ordering::SeqCst) {
            client.close();
        }
    }

    pub fn detach(&self, connection_id: Uuid) {
        self.sessions.remove(&connection_id);
    }

    /// Number of open sessions, including presence sessions that observe
    /// nobody.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run a connection future under the hub's task tracker.
    pub fn track<F>(&self, session: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        self.tasks.track_future(session)
    }

    /// Ask every open session to close. Sessions attached later are closed
    /// as they attach.
    pub fn close_all(&self) -> usize {
        self.closing.store(true, Ordering::SeqCst);
        let mut closed = 0;
        for session in self.sessions.iter() {
            session.value().close();
            closed += 1;
        }
        closed
    }

    /// Wait for every tracked connection to finish its cleanup.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Publish an event to every process serving this room kind.
    pub async fn publish(&self, message: &PublishedMessage) {
        self.bridge.publish(message).await;
    }

    /// Deliver a relayed event to the local clients of its room.
    pub fn deliver(&self, relayed: &Relayed) -> FanoutReport {
        let frame: Frame = Arc::from(relayed.raw.as_str());
        let report = self.registry.fanout(relayed.message.room_id, &frame);
        metrics::record_fanout(self.kind, report.delivered, report.failed);

        debug!(
            room_kind = %self.kind,
            room_id = relayed.message.room_id,
            event = %relayed.message.event,
            delivered = report.delivered,
            failed = report.failed,
            "Fan-out complete"
        );
        report
    }

    /// Subscribe to the broker channel and spawn the fan-out task.
    ///
    /// A subscription that cannot be established is returned as an error;
    /// the caller treats it as fatal.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, AppError> {
        let stream = self.bridge.subscribe().await?;
        let hub = Arc::clone(self);

        info!(room_kind = %self.kind, channel = %self.bridge.channel(), "Hub started");
        Ok(tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(relayed) = stream.next().await {
                hub.deliver(&relayed);
            }
            error!(room_kind = %hub.kind, "Broker subscription ended");
        }))
    }
}

/// The three hubs of one process.
#[derive(Clone)]
pub struct Hubs {
    pub chat: Arc<Hub>,
    pub presence: Arc<Hub>,
    pub whiteboard: Arc<Hub>,
}

impl Hubs {
    pub fn get(&self, kind: RoomKind) -> &Arc<Hub> {
        match kind {
            RoomKind::Chat => &self.chat,
            RoomKind::Presence => &self.presence,
            RoomKind::Whiteboard => &self.whiteboard,
        }
    }

    pub async fn start(&self) -> Result<Vec<JoinHandle<()>>, AppError> {
        let mut tasks = Vec::with_capacity(RoomKind::ALL.len());
        for kind in RoomKind::ALL {
            tasks.push(self.get(kind).start().await?);
        }
        Ok(tasks)
    }

    /// Close every open session of every hub.
    pub fn close_all(&self) -> usize {
        RoomKind::ALL
            .iter()
            .map(|kind| self.get(*kind).close_all())
            .sum()
    }

    /// Close every session and wait up to `grace` for their cleanup.
    ///
    /// Returns `false` if some session was still running when `grace` ran
    /// out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let closed = self.close_all();
        let drained = futures::future::join_all(RoomKind::ALL.iter().map(|kind| self.get(*kind).drain()));

        match tokio::time::timeout(grace, drained).await {
            Ok(_) => {
                info!(closed, "All WebSocket sessions finished");
                true
            }
            Err(_) => {
                let remaining: usize = RoomKind::ALL
                    .iter()
                    .map(|kind| self.get(*kind).session_count())
                    .sum();
                warn!(remaining, "WebSocket sessions still running after shutdown grace period");
                false
            }
        }
    }
}
