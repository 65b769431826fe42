//! Application Startup
//!
//! Application building and server initialization.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::application::services::{ChatService, JwtVerifier, PresenceService};
use crate::config::Settings;
use crate::domain::{ChatRepository, PresenceRepository, RoomKind, WhiteboardRepository};
use crate::infrastructure::broker::{Broker, RedisBroker};
use crate::infrastructure::cache::{self, Cache, RedisCache};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    InMemoryStore, PgChatRepository, PgPresenceRepository, PgWhiteboardRepository,
};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{
    chat_router, presence_router, whiteboard_router, Bridge, Hub, Hubs, Presence,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub verifier: Arc<JwtVerifier>,
    pub chat: Arc<ChatService>,
    pub presence: Presence,
    pub hubs: Hubs,
    pub cache: Arc<dyn Cache>,
}

/// External collaborators the hub is wired to.
///
/// Production builds these from Postgres and Redis; tests substitute the
/// in-memory store and broker.
#[derive(Clone)]
pub struct Collaborators {
    pub chat: Arc<dyn ChatRepository>,
    pub presence: Arc<dyn PresenceRepository>,
    pub whiteboards: Arc<dyn WhiteboardRepository>,
    pub cache: Arc<dyn Cache>,
    pub broker: Arc<dyn Broker>,
}

impl Collaborators {
    /// Back every repository with the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, cache: Arc<dyn Cache>, broker: Arc<dyn Broker>) -> Self {
        Self {
            chat: store.clone(),
            presence: store.clone(),
            whiteboards: store,
            cache,
            broker,
        }
    }
}

/// Time allowed for open sessions to finish their cleanup on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    hubs: Hubs,
    fanout_tasks: Vec<JoinHandle<()>>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        // Create Redis connections: one manager for the cache, one client for pub/sub
        let redis = cache::create_redis_client(&settings.redis).await?;
        let broker = RedisBroker::connect(&settings.redis).await?;
        tracing::info!("Redis connection established");

        let collaborators = Collaborators {
            chat: Arc::new(PgChatRepository::new(db.clone())),
            presence: Arc::new(PgPresenceRepository::new(db.clone())),
            whiteboards: Arc::new(PgWhiteboardRepository::new(db)),
            cache: Arc::new(RedisCache::new(redis)),
            broker: Arc::new(broker),
        };

        Self::build_with(settings, collaborators).await
    }

    /// Build the application around already-connected collaborators.
    ///
    /// Fails if any hub cannot subscribe to its broker channel.
    pub async fn build_with(settings: Settings, collaborators: Collaborators) -> Result<Self> {
        handlers::health::init_server_start();
        let policy = settings.websocket.malformed_payload_policy;

        let chat = Arc::new(ChatService::new(
            collaborators.chat,
            collaborators.whiteboards,
        ));
        let presence = Presence::new(Arc::new(PresenceService::new(
            collaborators.presence,
            collaborators.cache.clone(),
            Duration::from_secs(settings.presence.status_ttl_secs),
        )));

        let broker = collaborators.broker;
        let hub = |kind: RoomKind, channel: &str, router| {
            Arc::new(Hub::new(
                kind,
                Bridge::new(kind, broker.clone(), channel),
                router,
            ))
        };
        let hubs = Hubs {
            chat: hub(
                RoomKind::Chat,
                &settings.broker.chat_channel,
                chat_router(chat.clone(), policy),
            ),
            presence: hub(
                RoomKind::Presence,
                &settings.broker.presence_channel,
                presence_router(presence.clone(), policy),
            ),
            whiteboard: hub(
                RoomKind::Whiteboard,
                &settings.broker.whiteboard_channel,
                whiteboard_router(policy),
            ),
        };

        // Subscribe failures are fatal
        let fanout_tasks = hubs.start().await?;

        // Create app state
        let state = AppState {
            verifier: Arc::new(JwtVerifier::new(&settings.jwt)),
            chat,
            presence,
            hubs: hubs.clone(),
            cache: collaborators.cache,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            hubs,
            fanout_tasks,
        })
    }

    /// Run the server until SIGINT or SIGTERM
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `signal` resolves, then close every session and
    /// wait for their cleanup.
    pub async fn run_until(self, signal: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let hubs = self.hubs.clone();
        let shutdown = async move {
            signal.await;
            let closed = hubs.close_all();
            tracing::info!(closed, "Shutting down, closing WebSocket sessions");
        };

        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        // Upgraded sockets outlive the HTTP server; presence sessions still
        // have to record their users as offline.
        self.hubs.shutdown(SHUTDOWN_GRACE).await;

        for task in &self.fanout_tasks {
            task.abort();
        }
        served?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hubs(&self) -> &Hubs {
        &self.hubs
    }

    /// The fully layered router, for driving requests without a socket
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
