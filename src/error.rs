//! Error taxonomy for the orchestration core.
//!
//! Tool-level failures (unknown tool, bad arguments, handler errors)
//! never appear here: the registry absorbs them into failed
//! [`crate::types::ToolCallRecord`]s. Only completion-service failures
//! and boundary validation failures travel as `Err`.

use thiserror::Error;

/// Failure talking to the completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(String),
    #[error("completion service error ({status}): {body}")]
    Service { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion request timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(err.to_string())
        } else {
            CompletionError::Http(err.to_string())
        }
    }
}

/// Failure of a whole orchestration turn.
///
/// A round-1 completion failure aborts the turn; round-2 failures are
/// degraded inside the orchestrator and never surface here.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("completion round failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
