use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::metrics::BroadcastMetrics;

use super::frame::format_event;
use super::stats::{
    HealthMetrics, MemoryUsage, SessionStats, SessionSummary, StatsUpdate, StatsUpdateKind,
};
use super::{ClientHandle, ClientId, RealtimeError};

/// Capacity of the stats update channel; slow subscribers skip ahead
const STATS_CHANNEL_CAPACITY: usize = 256;

/// Clients and statistics of one session, created and dropped together
struct Room {
    clients: HashMap<ClientId, ClientHandle>,
    stats: SessionStats,
}

impl Room {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            clients: HashMap::new(),
            stats: SessionStats::new(now),
        }
    }

    fn summary(&self, session_code: &str) -> SessionSummary {
        SessionSummary {
            session_code: session_code.to_string(),
            clients: self.clients.len(),
            stats: self.stats.clone(),
        }
    }
}

/// Result of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastOutcome {
    /// Clients the frame was written to
    pub delivered: usize,
    /// Clients whose write failed and that were evicted
    pub failed: usize,
}

/// Registry of streaming clients grouped by session code.
///
/// One instance is created at startup and shared through `Arc`. Every
/// mutation of a session's client set and its statistics happens under the
/// same map entry lock, so a session has statistics exactly while it has
/// clients.
pub struct BroadcastManager {
    /// session_code -> Room
    rooms: DashMap<String, Room>,
    started: Instant,
    stats_tx: broadcast::Sender<StatsUpdate>,
    /// Last resident memory sample in bytes, 0 when unknown
    resident_bytes: AtomicU64,
}

impl BroadcastManager {
    pub fn new() -> Self {
        let (stats_tx, _) = broadcast::channel(STATS_CHANNEL_CAPACITY);
        Self {
            rooms: DashMap::new(),
            started: Instant::now(),
            stats_tx,
            resident_bytes: AtomicU64::new(0),
        }
    }

    /// Receive a [`StatsUpdate`] for every registration, deregistration and broadcast
    pub fn subscribe_stats(&self) -> broadcast::Receiver<StatsUpdate> {
        self.stats_tx.subscribe()
    }

    /// Add a client to a session, opening the session if this is its first client.
    ///
    /// Registering a handle that is already present leaves the client set
    /// unchanged but still counts as a join.
    pub fn register_client(&self, session_code: &str, handle: ClientHandle) {
        let now = Utc::now();
        let client_id = handle.id();

        let clients = {
            let mut room = self
                .rooms
                .entry(session_code.to_string())
                .or_insert_with(|| {
                    tracing::debug!(session_code = %session_code, "Session opened");
                    Room::new(now)
                });
            room.clients.insert(client_id, handle);
            room.stats.record_join(now);
            room.clients.len()
        };

        tracing::info!(
            session_code = %session_code,
            client_id = %client_id,
            clients = clients,
            "Client registered"
        );

        self.notify(session_code, StatsUpdateKind::ClientRegistered, clients, now);
    }

    /// Remove a client from a session.
    ///
    /// Unknown sessions and clients are ignored, so repeated calls are safe.
    /// Removing the last client closes the session and drops its statistics.
    /// Returns whether the client was registered.
    pub fn deregister_client(&self, session_code: &str, handle: &ClientHandle) -> bool {
        let now = Utc::now();
        let client_id = handle.id();

        let remaining = match self.rooms.entry(session_code.to_string()) {
            Entry::Occupied(mut entry) => {
                let room = entry.get_mut();
                if room.clients.remove(&client_id).is_none() {
                    return false;
                }
                room.stats.record_leave(now);
                let remaining = room.clients.len();
                if remaining == 0 {
                    entry.remove();
                }
                remaining
            }
            Entry::Vacant(_) => return false,
        };

        tracing::info!(
            session_code = %session_code,
            client_id = %client_id,
            clients = remaining,
            "Client deregistered"
        );

        if remaining == 0 {
            tracing::debug!(session_code = %session_code, "Session closed");
            self.notify(session_code, StatsUpdateKind::SessionClosed, 0, now);
        } else {
            self.notify(session_code, StatsUpdateKind::ClientDeregistered, remaining, now);
        }

        true
    }

    /// Fan an event out to every client of a session.
    ///
    /// Writes run concurrently and independently. Clients whose write fails
    /// are evicted afterwards; the failure never reaches the caller. A
    /// session without clients is a no-op.
    #[tracing::instrument(name = "realtime.broadcast", skip(self, payload))]
    pub async fn broadcast<T>(&self, session_code: &str, event: &str, payload: &T) -> BroadcastOutcome
    where
        T: Serialize + ?Sized,
    {
        if !self.rooms.contains_key(session_code) {
            tracing::trace!("No clients registered, skipping broadcast");
            return BroadcastOutcome::default();
        }

        let frame = match format_event(event, payload) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode broadcast payload");
                return BroadcastOutcome::default();
            }
        };

        let now = Utc::now();
        let clients: Vec<ClientHandle> = match self.rooms.get_mut(session_code) {
            Some(mut room) if !room.clients.is_empty() => {
                room.stats.record_broadcast(now);
                room.clients.values().cloned().collect()
            }
            _ => return BroadcastOutcome::default(),
        };
        let total = clients.len();
        BroadcastMetrics::record_broadcast(event);
        self.notify(session_code, StatsUpdateKind::Broadcast, total, now);

        let results = join_all(clients.iter().map(|client| {
            let frame = frame.clone();
            async move { client.write(frame).await }
        }))
        .await;

        let mut failed = Vec::new();
        for (client, result) in clients.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    client_id = %client.id(),
                    error = %e,
                    "Broadcast write failed, evicting client"
                );
                failed.push(client);
            }
        }

        for client in &failed {
            self.deregister_client(session_code, client);
            client.close();
        }

        let outcome = BroadcastOutcome {
            delivered: total - failed.len(),
            failed: failed.len(),
        };

        BroadcastMetrics::record_delivered(outcome.delivered as u64);
        if outcome.failed > 0 {
            BroadcastMetrics::record_broadcast_evictions(outcome.failed as u64);
        }

        tracing::debug!(
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Broadcast completed"
        );

        outcome
    }

    /// Write an event to a single client without touching the registry.
    ///
    /// Unlike [`broadcast`](Self::broadcast), a failed write is returned to
    /// the caller and the client is not evicted.
    pub async fn send_to_client<T>(
        &self,
        handle: &ClientHandle,
        event: &str,
        payload: &T,
    ) -> Result<(), RealtimeError>
    where
        T: Serialize + ?Sized,
    {
        let frame = format_event(event, payload)?;
        handle
            .write(frame)
            .await
            .map_err(|source| RealtimeError::Delivery {
                client_id: handle.id(),
                source,
            })
    }

    /// Close every client stream and drop all sessions.
    ///
    /// Used on shutdown so open streams end and the server can drain.
    pub fn close_all(&self) -> usize {
        let now = Utc::now();
        let session_codes: Vec<String> = self.rooms.iter().map(|entry| entry.key().clone()).collect();
        let mut closed = 0;

        for session_code in session_codes {
            if let Some((_, room)) = self.rooms.remove(&session_code) {
                for client in room.clients.values() {
                    client.close();
                    closed += 1;
                }
                self.notify(&session_code, StatsUpdateKind::SessionClosed, 0, now);
            }
        }

        tracing::info!(closed = closed, "Closed all client streams");
        closed
    }

    pub fn get_session_stats(&self, session_code: &str) -> Option<SessionSummary> {
        self.rooms
            .get(session_code)
            .map(|room| room.summary(session_code))
    }

    /// All active sessions, ordered by session code
    pub fn get_active_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = self
            .rooms
            .iter()
            .map(|entry| entry.value().summary(entry.key()))
            .collect();
        sessions.sort_by(|a, b| a.session_code.cmp(&b.session_code));
        sessions
    }

    pub fn get_health_metrics(&self) -> HealthMetrics {
        let mut active_sessions = 0;
        let mut total_clients = 0;
        let mut total_broadcasts = 0;

        for entry in self.rooms.iter() {
            active_sessions += 1;
            total_clients += entry.clients.len();
            total_broadcasts += entry.stats.broadcast_count;
        }

        HealthMetrics {
            active_sessions,
            total_clients,
            total_broadcasts,
            uptime_seconds: self.started.elapsed().as_secs(),
            memory: MemoryUsage {
                resident_bytes: match self.resident_bytes.load(Ordering::Relaxed) {
                    0 => None,
                    bytes => Some(bytes),
                },
            },
        }
    }

    /// Store the latest memory sample reported by [`get_health_metrics`](Self::get_health_metrics).
    ///
    /// Sampling is left to the health reporter so no registry call touches the filesystem.
    pub fn record_resident_memory(&self, bytes: Option<u64>) {
        self.resident_bytes.store(bytes.unwrap_or(0), Ordering::Relaxed);
    }

    fn notify(&self, session_code: &str, kind: StatsUpdateKind, clients: usize, at: DateTime<Utc>) {
        // No subscribers is fine
        let _ = self.stats_tx.send(StatsUpdate {
            session_code: session_code.to_string(),
            kind,
            clients,
            at,
        });
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
