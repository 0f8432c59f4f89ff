use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error type returned by handlers and the permission layer.
/// Each variant maps to one HTTP status; the `IntoResponse` impl renders
/// the JSON body so handlers can simply use `?`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials/token (401).
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed to perform the action (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The addressed resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A request field failed validation (400). Rendered as
    /// `{ "errors": { "<field>": ["<message>"] } }` so clients can attach
    /// the message to the offending form field.
    #[error("validation failed on `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Persistence-layer failure (500). The cause is logged at the call
    /// site and never surfaced to the client.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal failure (500), e.g. password hashing or token
    /// signing going wrong. Logged, never detailed to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for the common single-field validation rejection.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required" })),
            )
                .into_response(),
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": { field: [message] } })),
            )
                .into_response(),
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!("internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
