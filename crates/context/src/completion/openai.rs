//! OpenAI-compatible chat completion client

use super::{CompletionSettings, TextCompletionProvider};
use async_trait::async_trait;
use picforge_common::config::CompletionConfig;
use picforge_common::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    OpenAi,
    Azure,
}

/// Chat completions client for OpenAI and Azure OpenAI
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    flavor: Flavor,
    endpoint: String,
    api_key: String,
    model: String,
    api_version: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompletionProvider {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let flavor = match config.provider.as_str() {
            "azure" => Flavor::Azure,
            _ => Flavor::OpenAi,
        };

        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "completion.api_key is required".to_string(),
        })?;

        // Overall deadline is enforced by the caller's guard
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            flavor,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self) -> String {
        match self.flavor {
            Flavor::OpenAi => format!("{}/chat/completions", self.endpoint),
            Flavor::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, self.model, self.api_version
            ),
        }
    }
}

#[async_trait]
impl TextCompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            frequency_penalty: settings.frequency_penalty,
            presence_penalty: settings.presence_penalty,
            stop: &settings.stop_sequences,
        };

        let builder = self.client.post(self.url()).json(&request);
        let builder = match self.flavor {
            Flavor::OpenAi => builder.header("Authorization", format!("Bearer {}", self.api_key)),
            Flavor::Azure => builder.header("api-key", &self.api_key),
        };

        let response = builder.send().await.map_err(|e| AppError::Completion {
            message: format!("Request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion {
                message: format!("API error {}: {}", status, body),
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| AppError::Completion {
                message: format!("Failed to parse response: {}", e),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Completion {
                message: "Empty response from model".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> CompletionConfig {
        CompletionConfig {
            provider: provider.to_string(),
            endpoint: "https://example.openai.azure.com/".to_string(),
            api_key: Some("key".to_string()),
            model: "gpt-4o".to_string(),
            api_version: "2024-06-01".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_openai_url() {
        let provider = OpenAiCompletionProvider::new(&config("openai")).unwrap();
        assert_eq!(provider.url(), "https://example.openai.azure.com/chat/completions");
    }

    #[test]
    fn test_azure_url() {
        let provider = OpenAiCompletionProvider::new(&config("azure")).unwrap();
        assert_eq!(
            provider.url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut cfg = config("openai");
        cfg.api_key = None;
        assert!(OpenAiCompletionProvider::new(&cfg).is_err());
    }

    #[test]
    fn test_request_omits_empty_stop() {
        let stop: Vec<String> = Vec::new();
        let request = CompletionRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_tokens: 10,
            temperature: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: &stop,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
