//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::realtime::event_names;

use super::{
    BROADCASTS_TOTAL, CLIENTS_CONNECTED, CLIENTS_EVICTED_TOTAL, FRAMES_DELIVERED_TOTAL,
    PROCESS_MEMORY_BYTES, PROCESS_UPTIME_SECONDS, SESSIONS_ACTIVE, SSE_CONNECTIONS_CLOSED,
    SSE_CONNECTIONS_OPENED, SSE_CONNECTION_DURATION, SSE_HANDSHAKE_FAILURES,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for SSE connection lifecycle metrics
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    pub fn record_opened() {
        SSE_CONNECTIONS_OPENED.inc();
    }

    pub fn record_closed(duration_secs: f64) {
        SSE_CONNECTIONS_CLOSED.inc();
        SSE_CONNECTION_DURATION.observe(duration_secs);
    }

    pub fn record_handshake_failed() {
        SSE_HANDSHAKE_FAILURES.inc();
    }
}

/// Helper struct for broadcast fan-out metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record one broadcast to a non-empty session
    pub fn record_broadcast(event: &str) {
        BROADCASTS_TOTAL
            .with_label_values(&[broadcast_event_label(event)])
            .inc();
    }

    /// Record successful frame writes
    pub fn record_delivered(count: u64) {
        FRAMES_DELIVERED_TOTAL.inc_by(count);
    }

    /// Record clients evicted because a broadcast write failed
    pub fn record_broadcast_evictions(count: u64) {
        CLIENTS_EVICTED_TOTAL
            .with_label_values(&["broadcast"])
            .inc_by(count);
    }

    /// Record a client evicted because its heartbeat write failed
    pub fn record_heartbeat_eviction() {
        CLIENTS_EVICTED_TOTAL.with_label_values(&["heartbeat"]).inc();
    }
}

/// Helper struct for session gauges
pub struct SessionMetrics;

impl SessionMetrics {
    pub fn update(active_sessions: usize, connected_clients: usize) {
        SESSIONS_ACTIVE.set(active_sessions as i64);
        CLIENTS_CONNECTED.set(connected_clients as i64);
    }
}

/// Helper struct for memory metrics
pub struct MemoryMetrics;

impl MemoryMetrics {
    /// Resident set size of the current process in bytes, if the platform exposes it
    pub async fn resident_memory_bytes() -> Option<u64> {
        #[cfg(target_os = "linux")]
        {
            let status = tokio::fs::read_to_string("/proc/self/status").await.ok()?;
            parse_vm_rss(&status)
        }

        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }

    /// Update process memory and uptime gauges (call periodically)
    pub fn update_process(resident_bytes: Option<u64>, uptime_secs: u64) {
        if let Some(bytes) = resident_bytes {
            PROCESS_MEMORY_BYTES.set(bytes as i64);
        }
        PROCESS_UPTIME_SECONDS.set(uptime_secs as i64);
    }
}

/// Metric label for an event name; free-form names share one series
fn broadcast_event_label(event: &str) -> &'static str {
    match event {
        event_names::CONNECTED => event_names::CONNECTED,
        event_names::PARTICIPANT_JOINED => event_names::PARTICIPANT_JOINED,
        event_names::RESPONSE_RECEIVED => event_names::RESPONSE_RECEIVED,
        event_names::PARTICIPANT_COMPLETED => event_names::PARTICIPANT_COMPLETED,
        event_names::ANALYTICS_UPDATE => event_names::ANALYTICS_UPDATE,
        event_names::PARTICIPANT_DELETED => event_names::PARTICIPANT_DELETED,
        _ => "other",
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}
