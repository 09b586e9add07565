//! Error types for slush-vaporizer
//!
//! `VaporError` is the core taxonomy used by the pipeline and the job
//! orchestrator. `ApiError` is its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Core processing error
#[derive(Debug, Error)]
pub enum VaporError {
    /// External processing tool missing or not executable
    #[error("Processing tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Tool ran but rejected its input or parameters
    #[error("Processing tool failed: {0}")]
    ToolExecution(String),

    /// Feature extraction failed (recovered locally, never fails a job)
    #[error("Audio analysis failed: {0}")]
    AnalysisFailed(String),

    /// File read/write/delete failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed request fields, rejected before a job exists
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested artifact or job does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// slush-common error
    #[error("Common error: {0}")]
    Common(#[from] slush_common::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, VaporError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VaporError> for ApiError {
    fn from(e: VaporError) -> Self {
        match e {
            VaporError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            VaporError::NotFound(msg) => ApiError::NotFound(msg),
            VaporError::Io(err) => ApiError::Io(err),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
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

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
