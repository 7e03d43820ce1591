//! Prometheus metrics for the realtime service.
//!
//! - Session metrics (active sessions, connected clients)
//! - SSE connection metrics (opened, closed, duration)
//! - Broadcast metrics (broadcasts by event, deliveries, evictions)
//! - Heartbeat and process memory metrics

mod helpers;

pub use helpers::{encode_metrics, BroadcastMetrics, ConnectionMetrics, MemoryMetrics, SessionMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "quiz_realtime";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Sessions with at least one connected client
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Number of sessions with at least one connected client"
    ).unwrap();

    /// Connected clients across all sessions
    pub static ref CLIENTS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_clients_connected", METRIC_PREFIX),
        "Number of connected SSE clients across all sessions"
    ).unwrap();

    // ============================================================================
    // SSE Connection Metrics
    // ============================================================================

    /// SSE connections opened
    pub static ref SSE_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_sse_connections_opened_total", METRIC_PREFIX),
        "Total SSE connections opened"
    ).unwrap();

    /// SSE connections closed
    pub static ref SSE_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_sse_connections_closed_total", METRIC_PREFIX),
        "Total SSE connections closed"
    ).unwrap();

    /// SSE handshakes that could not be written
    pub static ref SSE_HANDSHAKE_FAILURES: IntCounter = register_int_counter!(
        format!("{}_sse_handshake_failures_total", METRIC_PREFIX),
        "Total SSE connections rejected because the handshake write failed"
    ).unwrap();

    /// SSE connection duration
    pub static ref SSE_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_sse_connection_duration_seconds", METRIC_PREFIX),
        "SSE connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0]
    ).unwrap();

    // ============================================================================
    // Broadcast Metrics
    // ============================================================================

    /// Broadcasts fanned out, by event name
    pub static ref BROADCASTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Total broadcasts fanned out to a non-empty session",
        &["event"]
    ).unwrap();

    /// Frames written to clients
    pub static ref FRAMES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_delivered_total", METRIC_PREFIX),
        "Total frames successfully written to clients"
    ).unwrap();

    /// Clients evicted after a failed write
    pub static ref CLIENTS_EVICTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_clients_evicted_total", METRIC_PREFIX),
        "Total clients evicted after a failed write",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Resident memory of the process
    pub static ref PROCESS_MEMORY_BYTES: IntGauge = register_int_gauge!(
        format!("{}_process_memory_bytes", METRIC_PREFIX),
        "Resident set size of the process in bytes"
    ).unwrap();

    /// Process uptime
    pub static ref PROCESS_UPTIME_SECONDS: IntGauge = register_int_gauge!(
        format!("{}_process_uptime_seconds", METRIC_PREFIX),
        "Seconds since the broadcast manager was created"
    ).unwrap();
}
