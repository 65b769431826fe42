//! Prometheus Metrics Module
//!
//! Hub metrics, exposed in Prometheus text format at `GET /metrics`.
//!
//! # Metrics Collected
//! - Active WebSocket connections per room kind
//! - Events published to the broker per room kind and event
//! - Fan-out deliveries per room kind and outcome

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::domain::RoomKind;

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Open WebSocket connections, labelled by room kind
pub static CONNECTIONS_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of joined WebSocket connections",
        )
        .namespace("chat_hub"),
        &["room_kind"],
    )
    .expect("Failed to create CONNECTIONS_ACTIVE metric")
});

/// Events handed to the broker
pub static EVENTS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_published_total", "Total number of events published").namespace("chat_hub"),
        &["room_kind", "event"],
    )
    .expect("Failed to create EVENTS_PUBLISHED_TOTAL metric")
});

/// Per-client fan-out writes
pub static FANOUT_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fanout_deliveries_total",
            "Total number of fan-out deliveries to local clients",
        )
        .namespace("chat_hub"),
        &["room_kind", "outcome"], // "delivered", "failed"
    )
    .expect("Failed to create FANOUT_DELIVERIES_TOTAL metric")
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_PUBLISHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_PUBLISHED_TOTAL");
    registry
        .register(Box::new(FANOUT_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register FANOUT_DELIVERIES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn connection_opened(kind: RoomKind) {
    CONNECTIONS_ACTIVE.with_label_values(&[kind.as_str()]).inc();
}

pub fn connection_closed(kind: RoomKind) {
    CONNECTIONS_ACTIVE.with_label_values(&[kind.as_str()]).dec();
}

pub fn record_publish(kind: RoomKind, event: &str) {
    EVENTS_PUBLISHED_TOTAL
        .with_label_values(&[kind.as_str(), event])
        .inc();
}

pub fn record_fanout(kind: RoomKind, delivered: usize, failed: usize) {
    if delivered > 0 {
        FANOUT_DELIVERIES_TOTAL
            .with_label_values(&[kind.as_str(), "delivered"])
            .inc_by(delivered as u64);
    }
    if failed > 0 {
        FANOUT_DELIVERIES_TOTAL
            .with_label_values(&[kind.as_str(), "failed"])
            .inc_by(failed as u64);
    }
}
