//! Session statistics and health snapshot structures

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Usage counters for one active session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Joins minus leaves, never below zero
    pub attendee_count: u64,
    /// Broadcasts fanned out to this session
    pub broadcast_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionStats {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            attendee_count: 0,
            broadcast_count: 0,
            started_at: now,
            last_activity: now,
        }
    }

    pub(crate) fn record_join(&mut self, now: DateTime<Utc>) {
        self.attendee_count += 1;
        self.last_activity = now;
    }

    pub(crate) fn record_leave(&mut self, now: DateTime<Utc>) {
        self.attendee_count = self.attendee_count.saturating_sub(1);
        self.last_activity = now;
    }

    pub(crate) fn record_broadcast(&mut self, now: DateTime<Utc>) {
        self.broadcast_count += 1;
        self.last_activity = now;
    }
}

/// One entry of the active session listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_code: String,
    /// Clients currently registered
    pub clients: usize,
    #[serde(flatten)]
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Resident set size; absent where the platform does not expose it
    pub resident_bytes: Option<u64>,
}

/// Aggregate snapshot across all sessions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub active_sessions: usize,
    pub total_clients: usize,
    pub total_broadcasts: u64,
    pub uptime_seconds: u64,
    pub memory: MemoryUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsUpdateKind {
    ClientRegistered,
    ClientDeregistered,
    SessionClosed,
    Broadcast,
}

/// Published whenever a session's statistics change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    pub session_code: String,
    pub kind: StatsUpdateKind,
    /// Clients registered after the change
    pub clients: usize,
    pub at: DateTime<Utc>,
}
