//! Completion client error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during completion calls
///
/// `Timeout` and `ApiError` are distinct failure causes but share the same
/// retry budget inside the client. `InvalidResponse` is terminal: it means the
/// service answered but the envelope did not contain the expected fields.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retried after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
