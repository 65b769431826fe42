//! Health Check Handlers
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the process serving?)
//! - `GET /health/ready` - Readiness probe (store, cache and room occupancy)

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::domain::RoomKind;
use crate::shared::error::AppError;
use crate::startup::AppState;

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pings slower than this are reported as degraded
const STORE_DEGRADED_MS: u64 = 100;
const CACHE_DEGRADED_MS: u64 = 50;

/// Pin the uptime origin to process startup.
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Only the store is critical; a failing cache degrades presence only.
    fn overall(store: HealthStatus, cache: HealthStatus) -> HealthStatus {
        match (store, cache) {
            (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        }
    }

    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollaboratorHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollaboratorHealth {
    fn from_ping(result: Result<(), AppError>, latency_ms: u64, degraded_after_ms: u64) -> Self {
        match result {
            Ok(()) => Self {
                status: if latency_ms < degraded_after_ms {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency_ms),
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Occupancy of one hub
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoomHealth {
    pub rooms: usize,
    /// Registry entries; one per observed notifier for presence
    pub connections: usize,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct Collaborators {
    pub store: CollaboratorHealth,
    pub cache: CollaboratorHealth,
}

#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: Collaborators,
    pub rooms: BTreeMap<&'static str, RoomHealth>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Always 200 while the process can answer HTTP
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}

/// 200 while the store answers (possibly degraded), 503 otherwise
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = timed_ping(state.chat.ping(), STORE_DEGRADED_MS).await;
    let cache = timed_ping(state.cache.ping(), CACHE_DEGRADED_MS).await;

    let rooms = RoomKind::ALL
        .iter()
        .map(|kind| {
            let hub = state.hubs.get(*kind);
            (
                kind.as_str(),
                RoomHealth {
                    rooms: hub.registry().size(),
                    connections: hub.registry().entry_count(),
                    sessions: hub.session_count(),
                },
            )
        })
        .collect();

    let status = HealthStatus::overall(store.status, cache.status);
    let report = ReadinessReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: Collaborators { store, cache },
        rooms,
    };

    (status.status_code(), Json(report))
}

async fn timed_ping(
    ping: impl Future<Output = Result<(), AppError>>,
    degraded_after_ms: u64,
) -> CollaboratorHealth {
    let start = Instant::now();
    let result = ping.await;
    CollaboratorHealth::from_ping(result, start.elapsed().as_millis() as u64, degraded_after_ms)
}
