//! SSE handler implementation.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AppError, Result};
use crate::metrics::{BroadcastMetrics, ConnectionMetrics};
use crate::realtime::{
    canonical_session_code, event_names, heartbeat_frame, BroadcastManager, ChannelSink,
    ClientHandle, ClientId,
};
use crate::server::AppState;

const MAX_SESSION_CODE_LEN: usize = 64;

/// Payload of the initial `connected` event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub session_code: String,
    pub timestamp: String,
    pub client_id: ClientId,
}

/// SSE stream handler
#[tracing::instrument(name = "sse.connect", skip_all, fields(session_code = %code))]
pub async fn sse_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let session_code = normalize_session_code(&code)?;
    let manager = state.broadcast_manager.clone();

    let (sink, rx) = ChannelSink::new(state.settings.sse.channel_capacity);
    let handle = ClientHandle::new(sink);

    // Queued ahead of any broadcast, so `connected` is always the first frame
    let connected = ConnectedEvent {
        session_code: session_code.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        client_id: handle.id(),
    };
    if let Err(e) = manager
        .send_to_client(&handle, event_names::CONNECTED, &connected)
        .await
    {
        ConnectionMetrics::record_handshake_failed();
        manager.deregister_client(&session_code, &handle);
        handle.close();
        return Err(AppError::from(e));
    }

    manager.register_client(&session_code, handle.clone());
    ConnectionMetrics::record_opened();

    tracing::info!(
        session_code = %session_code,
        client_id = %handle.id(),
        "SSE connection established"
    );

    let heartbeat = spawn_heartbeat(
        manager.clone(),
        session_code.clone(),
        handle.clone(),
        Duration::from_secs(state.settings.sse.heartbeat_interval),
    );

    let guard = ConnectionGuard {
        manager,
        session_code,
        handle,
        heartbeat,
        started: Instant::now(),
    };

    Ok(sse_response(Body::from_stream(frame_stream(rx, guard))))
}

/// Trim and upper-case a session code taken from the route
pub fn normalize_session_code(raw: &str) -> Result<String> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(AppError::Validation("Session code must not be empty".to_string()));
    }
    if code.len() > MAX_SESSION_CODE_LEN {
        return Err(AppError::Validation(format!(
            "Session code exceeds {} characters",
            MAX_SESSION_CODE_LEN
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Session code may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }

    Ok(canonical_session_code(code))
}

fn sse_response(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}

/// Stream the client's frames until its sink is closed or the client goes away
fn frame_stream(
    rx: mpsc::Receiver<String>,
    guard: ConnectionGuard,
) -> impl Stream<Item = std::result::Result<String, Infallible>> {
    async_stream::stream! {
        // Dropped together with the response body
        let _guard = guard;

        let mut frames = ReceiverStream::new(rx);
        while let Some(frame) = frames.next().await {
            yield Ok(frame);
        }
    }
}

/// Write a comment frame every `interval` until a write fails.
///
/// On failure the timer is stopped first, then the client is evicted.
fn spawn_heartbeat(
    manager: Arc<BroadcastManager>,
    session_code: String,
    handle: ClientHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip immediate first tick
        ticker.tick().await;

        let error = loop {
            ticker.tick().await;
            if let Err(e) = handle.write(heartbeat_frame()).await {
                break e;
            }
        };
        drop(ticker);

        tracing::debug!(
            session_code = %session_code,
            client_id = %handle.id(),
            error = %error,
            "Heartbeat failed, evicting client"
        );
        BroadcastMetrics::record_heartbeat_eviction();
        manager.deregister_client(&session_code, &handle);
        handle.close();
    })
}

/// Tears the connection down when the response body is dropped
struct ConnectionGuard {
    manager: Arc<BroadcastManager>,
    session_code: String,
    handle: ClientHandle,
    heartbeat: JoinHandle<()>,
    started: Instant,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // Stop the timer before the handle is released
        self.heartbeat.abort();

        self.manager.deregister_client(&self.session_code, &self.handle);
        self.handle.close();

        let duration = self.started.elapsed().as_secs_f64();
        ConnectionMetrics::record_closed(duration);

        tracing::info!(
            session_code = %self.session_code,
            client_id = %self.handle.id(),
            duration_secs = duration,
            "SSE connection closed"
        );
    }
}
