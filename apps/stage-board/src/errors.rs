use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::board::engine::DragError;
use crate::board::{BoardError, FieldErrors};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Pipeline service error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: FieldErrors::default(),
        }
    }
}

impl From<BoardError> for AppError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::Drag(DragError::UnknownCandidate(_)) | BoardError::UnknownCandidate(_) => {
                AppError::NotFound(err.to_string())
            }
            BoardError::Drag(_)
            | BoardError::NoPendingMove
            | BoardError::SubmissionInFlight
            | BoardError::Busy => AppError::Conflict(err.to_string()),
            BoardError::Validation(fields) => AppError::Validation {
                message: "Invalid input".to_string(),
                fields,
            },
            BoardError::Api(e) => AppError::Upstream(e.to_string()),
            BoardError::Task(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Validation { message, fields } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                (!fields.is_empty()).then_some(fields),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::Upstream(msg) => {
                tracing::error!("Pipeline service error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The recruitment service could not be reached".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
