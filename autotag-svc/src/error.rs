//! API error types

use crate::services::job_manager::JobError;
use crate::services::scanner::ScanError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., batch job already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            JobError::NoActiveJob => ApiError::BadRequest(err.to_string()),
            JobError::Scan(ScanError::PathNotFound(_)) => ApiError::NotFound(err.to_string()),
            JobError::Scan(ScanError::NotADirectory(_)) => ApiError::BadRequest(err.to_string()),
            JobError::Scan(_) => ApiError::Internal(err.to_string()),
            JobError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
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

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_job_error_status_mapping() {
        let conflict: ApiError = JobError::AlreadyRunning(uuid::Uuid::new_v4()).into();
        assert!(matches!(conflict, ApiError::Conflict(_)));

        let no_job: ApiError = JobError::NoActiveJob.into();
        assert!(matches!(no_job, ApiError::BadRequest(_)));

        let missing: ApiError = JobError::Scan(ScanError::PathNotFound(PathBuf::from("/x"))).into();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }
}
