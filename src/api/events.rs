//! Event publishing endpoints used by the rest of the quiz platform.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::realtime::{validate_event_name, BroadcastOutcome, QuizEvent};
use crate::server::AppState;
use crate::sse::normalize_session_code;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub accepted: bool,
    pub event: String,
    pub session_code: String,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub session_code: String,
    pub event: String,
    #[serde(flatten)]
    pub outcome: BroadcastOutcome,
}

/// POST /api/v1/sessions/{code}/events - Publish a quiz event without waiting for delivery
#[tracing::instrument(
    name = "http.publish_event",
    skip_all,
    fields(session_code = %code, event = event.event_name())
)]
pub async fn publish_event(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(event): Json<QuizEvent>,
) -> Result<(StatusCode, Json<PublishResponse>)> {
    let session_code = normalize_session_code(&code)?;
    let event_name = event.event_name();

    // Delivery is not awaited
    drop(state.notifier.publish(&session_code, event));

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            accepted: true,
            event: event_name.to_string(),
            session_code,
        }),
    ))
}

/// POST /api/v1/sessions/{code}/broadcast - Broadcast an arbitrary event and report delivery
#[tracing::instrument(
    name = "http.broadcast",
    skip_all,
    fields(session_code = %code, event = %request.event)
)]
pub async fn broadcast_event(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>> {
    let session_code = normalize_session_code(&code)?;
    validate_event_name(&request.event)?;

    let outcome = state
        .broadcast_manager
        .broadcast(&session_code, &request.event, &request.payload)
        .await;

    Ok(Json(BroadcastResponse {
        session_code,
        event: request.event,
        outcome,
    }))
}
