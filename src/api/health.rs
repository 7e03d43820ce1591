//! Health check and session inspection endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::realtime::{HealthMetrics, SessionSummary};
use crate::server::AppState;
use crate::sse::normalize_session_code;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(flatten)]
    pub metrics: HealthMetrics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub total_sessions: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.broadcast_manager.get_health_metrics(),
    })
}

/// GET /api/sessions - Sessions with at least one connected viewer
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.broadcast_manager.get_active_sessions();
    let total = sessions.len();

    Json(SessionListResponse {
        sessions,
        total_sessions: total,
    })
}

/// GET /api/sessions/{code}/stats
pub async fn session_stats(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>> {
    let session_code = normalize_session_code(&code)?;

    state
        .broadcast_manager
        .get_session_stats(&session_code)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {} has no connected clients", session_code)))
}
