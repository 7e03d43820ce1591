use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use quiz_realtime_service::config::Settings;
use quiz_realtime_service::realtime::BroadcastManager;
use quiz_realtime_service::server::{create_app, AppState};
use quiz_realtime_service::tasks::HealthReporter;
use quiz_realtime_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing (held until exit to flush spans)
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(settings.clone());
    tracing::info!("Application state initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start health reporter in background
    let reporter = HealthReporter::new(
        settings.health.clone(),
        state.broadcast_manager.clone(),
        shutdown_tx.subscribe(),
    );
    let reporter_handle = tokio::spawn(async move {
        reporter.run().await;
    });

    let manager = state.broadcast_manager.clone();

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx, manager))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = reporter_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>, manager: Arc<BroadcastManager>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop background tasks
    let _ = shutdown_tx.send(());

    // End open streams so in-flight connections can drain
    manager.close_all();
}
