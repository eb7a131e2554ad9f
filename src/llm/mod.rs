//! Completion client module
//!
//! One call = one request/response exchange with the external text-completion
//! service. The trait seam keeps the solving loop testable; the OpenRouter
//! implementation owns retries, backoff, and envelope extraction.

pub mod client;
mod error;
mod models;
mod openrouter;
mod types;

pub use client::CompletionClient;
pub use error::LlmError;
pub use models::{ModelConfig, ModelInfo, available_models, model_config};
pub use openrouter::{OPENROUTER_API_URL, OpenRouterClient};
pub use types::{CompletionRequest, Message, Role};
