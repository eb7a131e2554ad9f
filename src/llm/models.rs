//! Static per-model configuration
//!
//! Known model ids get tuned sampling and capability flags; unknown ids fall
//! back to a conservative default.

use serde::Serialize;
use tracing::debug;

/// Capability and sampling defaults for one model id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub provider: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub supports_system: bool,
    pub supports_thinking: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            max_tokens: 4096,
            temperature: 0.1,
            top_p: 1.0,
            supports_system: true,
            supports_thinking: false,
        }
    }
}

/// Look up the configuration for a model id
///
/// Unknown ids get the default configuration.
pub fn model_config(model: &str) -> ModelConfig {
    debug!(%model, "model_config: called");
    match model {
        "google/gemini-2.5-pro" => ModelConfig {
            provider: "google".to_string(),
            max_tokens: 8192,
            ..Default::default()
        },
        "openai/gpt-oss-20b:free" => ModelConfig::default(),
        _ => {
            debug!(%model, "model_config: unknown model, using default");
            ModelConfig::default()
        }
    }
}

/// One entry in the model catalog listing
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    pub max_tokens: u32,
    pub supports_thinking: bool,
}

/// List the models with a predefined configuration
pub fn available_models() -> Vec<ModelInfo> {
    debug!("available_models: called");
    ["google/gemini-2.5-pro", "openai/gpt-oss-20b:free"]
        .into_iter()
        .map(|name| {
            let config = model_config(name);
            ModelInfo {
                name: name.to_string(),
                provider: config.provider,
                max_tokens: config.max_tokens,
                supports_thinking: config.supports_thinking,
            }
        })
        .collect()
}
