//! Errors surfaced by LLM adapters.

/// Errors an [`crate::LlmClient`] implementation can return.
///
/// `Unavailable` is the one variant the pipeline/HTTP layers translate to a
/// dedicated outcome (503 at the HTTP boundary) rather than a generic
/// failure -- everything else collapses into the executor's `Internal`
/// bucket.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned a response that could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("LLM returned an error status: {0}")]
    ErrorStatus(String),
}

impl LlmError {
    /// Whether this failure should be reported to the caller as "the LLM
    /// backend is unavailable" rather than a generic internal error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LlmError::Timeout(_) | LlmError::Transport(_) | LlmError::ErrorStatus(_))
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
