use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::config::HealthConfig;
use crate::metrics::{MemoryMetrics, SessionMetrics};
use crate::realtime::{BroadcastManager, HealthMetrics, StatsUpdate};

/// Background task that periodically snapshots realtime health
pub struct HealthReporter {
    config: HealthConfig,
    manager: Arc<BroadcastManager>,
    updates: broadcast::Receiver<StatsUpdate>,
    shutdown: broadcast::Receiver<()>,
}

impl HealthReporter {
    pub fn new(
        config: HealthConfig,
        manager: Arc<BroadcastManager>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let updates = manager.subscribe_stats();
        Self {
            config,
            manager,
            updates,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires
    pub async fn run(mut self) {
        let mut report_timer =
            tokio::time::interval(Duration::from_secs(self.config.report_interval));

        // Skip immediate first tick
        report_timer.tick().await;

        // Health checks see a memory figure before the first report
        self.sample_memory().await;

        tracing::info!(
            report_interval_secs = self.config.report_interval,
            "Health reporter started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Health reporter received shutdown signal");
                    break;
                }
                _ = report_timer.tick() => {
                    self.report().await;
                }
                update = self.updates.recv() => {
                    match update {
                        Ok(update) => {
                            tracing::trace!(
                                session_code = %update.session_code,
                                kind = ?update.kind,
                                clients = update.clients,
                                "Session stats updated"
                            );
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped = skipped, "Stats update subscriber lagged");
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("Stats update channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Health reporter stopped");
    }

    async fn sample_memory(&self) {
        let resident_bytes = MemoryMetrics::resident_memory_bytes().await;
        self.manager.record_resident_memory(resident_bytes);
    }

    /// Take a snapshot, refresh gauges and log it when any session is active
    async fn report(&self) -> HealthMetrics {
        self.sample_memory().await;
        let health = self.manager.get_health_metrics();

        SessionMetrics::update(health.active_sessions, health.total_clients);
        MemoryMetrics::update_process(health.memory.resident_bytes, health.uptime_seconds);

        if health.active_sessions > 0 {
            tracing::info!(
                active_sessions = health.active_sessions,
                total_clients = health.total_clients,
                total_broadcasts = health.total_broadcasts,
                uptime_secs = health.uptime_seconds,
                resident_bytes = ?health.memory.resident_bytes,
                "Realtime health"
            );
        }

        health
    }
}
