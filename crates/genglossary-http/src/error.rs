//! Centralized mapping from the core error taxonomy to HTTP status codes.
//!
//! Every handler returns `Result<T, ApiError>`; nothing maps a status code
//! ad hoc inline. [`PipelineError::Cancelled`] never reaches a handler in
//! practice (it is resolved by the worker thread before the run's status is
//! ever read back), but is still given a conservative 500 mapping here
//! rather than left to panic a `match`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use genglossary_core::validation::ValidationError;
use genglossary_pipeline::PipelineError;
use genglossary_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    /// A `spawn_blocking` task panicked rather than returning an error.
    #[error("{0}")]
    TaskPanicked(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::TaskPanicked(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Storage(StorageError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(StorageError::AlreadyRunning) => (StatusCode::CONFLICT, "ALREADY_RUNNING"),
            ApiError::Storage(StorageError::ConstraintViolation(_)) => (StatusCode::CONFLICT, "CONSTRAINT_VIOLATION"),
            ApiError::Storage(StorageError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Pipeline(PipelineError::Storage(StorageError::NotFound { .. })) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Pipeline(PipelineError::Storage(StorageError::AlreadyRunning)) => {
                (StatusCode::CONFLICT, "ALREADY_RUNNING")
            }
            ApiError::Pipeline(PipelineError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Pipeline(e) if e.is_llm_unavailable() => (StatusCode::SERVICE_UNAVAILABLE, "LLM_UNAVAILABLE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorBody { error: self.to_string(), code };
        (status, Json(body)).into_response()
    }
}
