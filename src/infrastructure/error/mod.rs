use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::realtime::RealtimeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, String) {
        match self {
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Realtime(e) => {
                let code = match e {
                    RealtimeError::Delivery { .. } => "DELIVERY_FAILED",
                    RealtimeError::Serialization(_) => "SERIALIZATION_ERROR",
                    RealtimeError::InvalidEventName(_) => "VALIDATION_ERROR",
                };
                let status = match e {
                    RealtimeError::InvalidEventName(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let log_msg = e.to_string();
                let client_msg = if is_production() && status.is_server_error() {
                    "Stream could not be established".to_string()
                } else {
                    log_msg.clone()
                };
                (status, code, client_msg, log_msg)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = self.parts();

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
