//! Error types for mixcut
//!
//! One taxonomy for pipeline and API layers. Flow errors carry enough
//! context to report the engine's diagnostics; the `IntoResponse` impl
//! maps each variant to an HTTP status and a JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Operation error type
#[derive(Debug, Error)]
pub enum OpError {
    /// Bad or missing request parameters; no resources acquired yet
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Temp storage or other filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transcoding engine exited nonzero
    #[error("Transcode failed (exit {exit:?}): {stderr}")]
    Transcode {
        exit: Option<i32>,
        stderr: String,
    },

    /// Engine reported success but produced no output file
    #[error("Transcoder produced no output at {0}")]
    MissingOutput(PathBuf),

    /// Remote synthesis/cloning provider unreachable or malformed response
    #[error("Provider error: {0}")]
    Provider(String),

    /// No caller identity on the request (auth layer misconfigured or absent)
    #[error("Unauthenticated")]
    Unauthorized,

    /// Requesting identity does not own the artifact
    #[error("Forbidden")]
    Forbidden,

    /// Artifact id not present in the store
    #[error("Clip not found: {0}")]
    NotFound(Uuid),

    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generic internal error
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for OpError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            OpError::Validation(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            OpError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "No caller identity supplied".to_string(),
            ),
            OpError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You do not own this clip".to_string(),
            ),
            OpError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Clip not found: {}", id),
            ),
            OpError::Provider(msg) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg),
            OpError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ref err @ OpError::Transcode { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRANSCODE_ERROR",
                err.to_string(),
            ),
            ref err @ OpError::MissingOutput(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRANSCODE_ERROR",
                err.to_string(),
            ),
            OpError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            OpError::Internal(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for pipeline flows and API handlers
pub type OpResult<T> = Result<T, OpError>;
