//! CompletionClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, LlmError};

/// Stateless completion client - each call is one independent exchange
///
/// Implementations own the retry/backoff discipline and the extraction of the
/// assistant text from the provider envelope. Callers get either the
/// completion text or a terminal error after retries are exhausted.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one completion request and return the assistant text
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
