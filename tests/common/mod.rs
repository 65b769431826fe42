//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure. Every test app runs
//! on an ephemeral port against in-memory collaborators; apps built from the
//! same [`Shared`] behave like separate processes behind one broker.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use futures::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};
use tower::ServiceExt;

use chat_hub::application::services::Claims;
use chat_hub::config::{
    BrokerSettings, CorsSettings, DatabaseSettings, JwtSettings, MalformedPayloadPolicy,
    PresenceSettings, RedisSettings, ServerSettings, Settings, WebSocketSettings,
};
use chat_hub::infrastructure::broker::MemoryBroker;
use chat_hub::infrastructure::cache::MemoryCache;
use chat_hub::infrastructure::repositories::InMemoryStore;
use chat_hub::presentation::websocket::Hubs;
use chat_hub::startup::{Application, Collaborators};

pub const TEST_SECRET: &str = "integration-test-secret-that-is-long-enough";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Collaborators shared by every app of one test
#[derive(Clone, Default)]
pub struct Shared {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub broker: Arc<MemoryBroker>,
}

impl Shared {
    pub fn new() -> Self {
        Self::default()
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators::in_memory(self.store.clone(), self.cache.clone(), self.broker.clone())
    }
}

pub fn test_settings(policy: MalformedPayloadPolicy) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 1,
        },
        redis: RedisSettings {
            url: "redis://unused".into(),
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            max_message_size: 64 * 1024,
            outbound_buffer: 64,
            malformed_payload_policy: policy,
        },
        presence: PresenceSettings {
            status_ttl_secs: 60,
        },
        broker: BrokerSettings {
            chat_channel: "chat_channel".into(),
            presence_channel: "observe_channel".into(),
            whiteboard_channel: "whiteboard_channel".into(),
        },
        environment: "test".into(),
    }
}

/// A running hub process
pub struct TestApp {
    pub addr: SocketAddr,
    pub router: Router,
    pub hubs: Hubs,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestApp {
    /// Spawn a lone app with its own collaborators
    pub async fn spawn() -> (Self, Shared) {
        let shared = Shared::new();
        let app = Self::spawn_with(&shared, MalformedPayloadPolicy::Drop).await;
        (app, shared)
    }

    pub async fn spawn_with(shared: &Shared, policy: MalformedPayloadPolicy) -> Self {
        let application = Application::build_with(test_settings(policy), shared.collaborators())
            .await
            .expect("Failed to build application");

        let addr = application.local_addr().unwrap();
        let router = application.router();
        let hubs = application.hubs().clone();

        let (tx, rx) = oneshot::channel();
        let server = tokio::spawn(application.run_until(async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            router,
            hubs,
            shutdown: Some(tx),
            server: Some(server),
        }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, user_id: i64) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("Authorization", format!("Bearer {}", token(user_id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Open a WebSocket as `user_id`
    pub async fn connect(&self, path: &str, user_id: i64) -> WsClient {
        let mut request = format!("ws://{}{}", self.addr, path)
            .into_client_request()
            .unwrap();
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", token(user_id)).parse().unwrap(),
        );
        let (ws, _) = connect_async(request).await.expect("WebSocket handshake failed");
        ws
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Signal shutdown and wait until the application has returned.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(server) = self.server.take() {
            server
                .await
                .expect("Server task panicked")
                .expect("Server failed");
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn token(user_id: i64) -> String {
    let claims = Claims {
        id: user_id,
        email: format!("user{}@example.com", user_id),
        first_name: "Test".into(),
        last_name: format!("User{}", user_id),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send_event(ws: &mut WsClient, event: &str, payload: Value) {
    let frame = serde_json::json!({ "event": event, "payload": payload });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next text frame as JSON, failing after two seconds
pub async fn next_event(ws: &mut WsClient) -> Value {
    let deadline = Duration::from_secs(2);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("Timed out waiting for an event")
            .expect("Connection ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
}

/// True if no text frame arrives within `window`
pub async fn stays_quiet(ws: &mut WsClient, window: Duration) -> bool {
    match tokio::time::timeout(window, ws.next()).await {
        Err(_) => true,
        Ok(Some(Ok(Message::Text(_)))) => false,
        Ok(_) => true,
    }
}

/// True once the server has closed the connection
pub async fn closed_by_server(ws: &mut WsClient) -> bool {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Poll `condition` until it holds, failing after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
