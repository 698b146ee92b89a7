//! Errors surfaced by the executor and run manager.

use genglossary_core::validation::ValidationError;
use genglossary_llm::LlmError;
use genglossary_storage::StorageError;

/// Errors an executor stage or the run manager can produce.
///
/// [`PipelineError::Cancelled`] is a dedicated sentinel, never folded into
/// [`PipelineError::Internal`]: the finalizer matches on it explicitly to
/// decide between a `cancelled` and `failed` terminal status.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run's cancellation signal was observed; unwind without error.
    #[error("run was cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether this error should be reported to callers as an LLM-backend
    /// availability problem (maps to 503 at the HTTP boundary).
    pub fn is_llm_unavailable(&self) -> bool {
        matches!(self, PipelineError::Llm(e) if e.is_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
