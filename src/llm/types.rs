//! Completion request/response types
//!
//! These types model the OpenRouter chat-completions API but stay
//! provider-agnostic: one request is one independent exchange.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction (may be empty)
    pub system_prompt: String,

    /// The new user turn
    pub user_prompt: String,

    /// Prior conversation turns, inserted between the system turn and the
    /// new user turn
    pub history: Vec<Message>,

    /// Sampling override; falls back to the model configuration when unset
    pub temperature: Option<f32>,

    /// Output ceiling override; falls back to the model configuration when unset
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request with no history and no sampling overrides
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        debug!("CompletionRequest::new: called");
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            history: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Attach prior conversation turns
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        debug!(turn_count = history.len(), "CompletionRequest::with_history: called");
        self.history = history;
        self
    }
}

/// A message turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_message_assistant() {
        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::assistant("x")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "x");
    }

    #[test]
    fn test_request_with_history() {
        let req = CompletionRequest::new("sys", "user").with_history(vec![Message::assistant("prior")]);
        assert_eq!(req.history.len(), 1);
        assert!(req.temperature.is_none());
        assert!(req.max_tokens.is_none());
    }
}
