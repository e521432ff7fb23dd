//! Language model completion abstraction
//!
//! Providers:
//! - OpenAI (chat completions)
//! - Azure OpenAI (deployment-scoped chat completions)

mod openai;

pub use openai::OpenAiCompletionProvider;

use async_trait::async_trait;
use picforge_common::config::{CompletionConfig, GenerationConfig};
use picforge_common::{AppError, Result};
use std::sync::Arc;

/// Generation settings for one completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop_sequences: Vec<String>,
}

impl CompletionSettings {
    /// Settings from a configured sampling group
    pub fn from_generation(generation: &GenerationConfig, max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: generation.temperature,
            top_p: generation.top_p,
            frequency_penalty: generation.frequency_penalty,
            presence_penalty: generation.presence_penalty,
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }
}

/// Trait for text completion
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    /// Complete a rendered prompt
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a completion provider based on configuration
pub fn create_completion_provider(
    config: &CompletionConfig,
) -> Result<Arc<dyn TextCompletionProvider>> {
    match config.provider.as_str() {
        "openai" | "azure" => {
            let provider = OpenAiCompletionProvider::new(config)?;
            tracing::info!(
                provider = %config.provider,
                model = %config.model,
                "Completion provider ready"
            );
            Ok(Arc::new(provider))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown completion provider: {}", other),
        }),
    }
}
