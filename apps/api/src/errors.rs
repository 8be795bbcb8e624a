use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Upstream, parse and internal failures are logged with their cause
/// and reported to the caller with a generic message only.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or AI endpoint failure. The payload is the caller-facing message.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The AI response did not contain acceptable structured data.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub const AI_FAILURE_MESSAGE: &str = "Failed to process document with AI";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Parse(detail) => {
                tracing::error!("AI response rejected: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    AI_FAILURE_MESSAGE.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
