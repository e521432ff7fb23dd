//! Configuration management for PicForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! Configuration is validated once at startup; nothing in the request path
//! reads the environment.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Prompt budget and templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Language model backend
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Knowledge retrieval backend
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Sort classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Token counting
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Link rewriting
    #[serde(default)]
    pub links: LinkConfig,

    /// Image serving
    #[serde(default)]
    pub images: ImageConfig,

    /// Diagnostics exposed to callers
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted input length in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

/// Sampling parameters for one kind of completion call
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,

    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
}

/// Prompt budget configuration and system texts.
///
/// Templates use `{{$Name}}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    /// Total tokens the model accepts (prompt + response)
    #[serde(default = "default_completion_token_limit")]
    pub completion_token_limit: u32,

    /// Tokens reserved for the model's answer
    #[serde(default = "default_response_token_limit")]
    pub response_token_limit: u32,

    /// Fraction of the remaining context budget given to retrieved snippets
    #[serde(default = "default_document_context_weight")]
    pub document_context_weight: f64,

    #[serde(default = "default_system_description")]
    pub system_description: String,

    #[serde(default = "default_system_intent")]
    pub system_intent: String,

    #[serde(default = "default_system_intent_continuation")]
    pub system_intent_continuation: String,

    #[serde(default = "default_system_response")]
    pub system_response: String,

    #[serde(default = "default_system_chat_continuation")]
    pub system_chat_continuation: String,

    #[serde(default = "default_intent_extraction_template")]
    pub intent_extraction_template: String,

    #[serde(default = "default_chat_prompt_template")]
    pub chat_prompt_template: String,

    /// First line of a non-empty snippet section
    #[serde(default = "default_knowledge_preamble")]
    pub knowledge_preamble: String,

    /// First line of a non-empty history section
    #[serde(default = "default_history_preamble")]
    pub history_preamble: String,

    /// Prepended to the extracted intent
    #[serde(default = "default_intent_prefix")]
    pub intent_prefix: String,

    #[serde(default = "default_intent_stop_sequences")]
    pub intent_stop_sequences: Vec<String>,

    /// Sampling for intent extraction
    #[serde(default = "default_intent_generation")]
    pub intent: GenerationConfig,

    /// Sampling for the final answer
    #[serde(default = "default_response_generation")]
    pub response: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    /// Provider: openai, azure
    #[serde(default = "default_completion_provider")]
    pub provider: String,

    /// API base URL
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// API key
    pub api_key: Option<String>,

    /// Model name (deployment name for azure)
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// API version (azure only)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Provider: search (HTTP search index), memory (local JSON file)
    #[serde(default = "default_retrieval_provider")]
    pub provider: String,

    /// Search service base URL
    pub endpoint: Option<String>,

    /// Search service API key
    pub api_key: Option<String>,

    /// Search API version
    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Knowledge collections queried for every request
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Maximum results per collection
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Document field holding the identifier
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Document field holding the snippet text
    #[serde(default = "default_text_field")]
    pub text_field: String,

    /// Document field used for chronological ordering
    #[serde(default = "default_date_field")]
    pub date_field: String,

    /// Document file for the memory provider
    pub memory_path: Option<String>,

    /// Per-collection timeout in seconds
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Provider: keyword, completion
    #[serde(default = "default_classifier_provider")]
    pub provider: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Encoding: cl100k_base, o200k_base, heuristic
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Characters per token for the heuristic counter
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Route prefix for rewritten image links
    #[serde(default = "default_image_route")]
    pub image_route: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Directory the image route serves from
    #[serde(default = "default_image_directory")]
    pub directory: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    /// Return the rendered prompt in the `prompt` variable
    #[serde(default)]
    pub expose_prompt: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 90 }
fn default_max_input_chars() -> usize { 4000 }
fn default_temperature() -> f32 { 0.7 }
fn default_top_p() -> f32 { 1.0 }
fn default_penalty() -> f32 { 0.5 }
fn default_completion_token_limit() -> u32 { 4096 }
fn default_response_token_limit() -> u32 { 1024 }
fn default_document_context_weight() -> f64 { 0.5 }
fn default_completion_provider() -> String { "openai".to_string() }
fn default_completion_endpoint() -> String { "https://api.openai.com/v1".to_string() }
fn default_completion_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_version() -> String { "2024-06-01".to_string() }
fn default_completion_timeout() -> u64 { 30 }
fn default_retrieval_provider() -> String { "memory".to_string() }
fn default_search_api_version() -> String { "2023-11-01".to_string() }
fn default_collections() -> Vec<String> { vec![crate::DEFAULT_COLLECTION.to_string()] }
fn default_top_k() -> usize { 10 }
fn default_id_field() -> String { "id".to_string() }
fn default_text_field() -> String { "text".to_string() }
fn default_date_field() -> String { "created_at".to_string() }
fn default_retrieval_timeout() -> u64 { 10 }
fn default_classifier_provider() -> String { "keyword".to_string() }
fn default_classifier_timeout() -> u64 { 10 }
fn default_encoding() -> String { crate::DEFAULT_ENCODING.to_string() }
fn default_chars_per_token() -> usize { 4 }
fn default_image_route() -> String { "/images/".to_string() }
fn default_image_directory() -> String { "images".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "picforge".to_string() }

fn default_intent_generation() -> GenerationConfig {
    GenerationConfig {
        temperature: 0.7,
        top_p: 1.0,
        frequency_penalty: 0.5,
        presence_penalty: 0.5,
    }
}

fn default_response_generation() -> GenerationConfig {
    GenerationConfig {
        temperature: 0.7,
        top_p: 1.0,
        frequency_penalty: 0.5,
        presence_penalty: 0.5,
    }
}

fn default_system_description() -> String {
    "This is a chat between an assistant that knows a personal picture library and a user. \
     The assistant answers from the picture descriptions it is given and names the files it refers to. \
     It does not invent pictures, and it keeps answers short."
        .to_string()
}

fn default_system_intent() -> String {
    "Rewrite the last message to reflect the user's intent, taking into consideration the provided chat history. \
     The output should be a single sentence that describes the user's intent and is understandable outside of \
     the chat history, in a way that is useful for searching picture descriptions. \
     Do not offer commentary and do not return a list of possible intents."
        .to_string()
}

fn default_system_intent_continuation() -> String {
    "REWRITTEN INTENT WITH EMBEDDED CONTEXT:\n[{{$now}}]:".to_string()
}

fn default_system_response() -> String {
    "Provide a single response to the last message. When a picture matches, mention its file name exactly \
     as written after 'File:' in the snippets."
        .to_string()
}

fn default_system_chat_continuation() -> String {
    "SINGLE RESPONSE FROM BOT TO USER:\n[{{$now}}] bot:".to_string()
}

fn default_intent_extraction_template() -> String {
    "{{$SystemDescription}}\n{{$SystemIntent}}\nChat history:\n{{$History}}\n{{$SystemIntentContinuation}}"
        .to_string()
}

fn default_chat_prompt_template() -> String {
    "{{$SystemDescription}}\n{{$SystemResponse}}\n{{$UserIntent}}\n{{$ChatContext}}\n{{$SystemChatContinuation}}"
        .to_string()
}

fn default_knowledge_preamble() -> String {
    "Here are relevant picture snippets and IDs:".to_string()
}
fn default_history_preamble() -> String { "Chat history:".to_string() }
fn default_intent_prefix() -> String { "User intent: ".to_string() }
fn default_intent_stop_sequences() -> Vec<String> { vec!["] bot:".to_string()] }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            completion_token_limit: default_completion_token_limit(),
            response_token_limit: default_response_token_limit(),
            document_context_weight: default_document_context_weight(),
            system_description: default_system_description(),
            system_intent: default_system_intent(),
            system_intent_continuation: default_system_intent_continuation(),
            system_response: default_system_response(),
            system_chat_continuation: default_system_chat_continuation(),
            intent_extraction_template: default_intent_extraction_template(),
            chat_prompt_template: default_chat_prompt_template(),
            knowledge_preamble: default_knowledge_preamble(),
            history_preamble: default_history_preamble(),
            intent_prefix: default_intent_prefix(),
            intent_stop_sequences: default_intent_stop_sequences(),
            intent: default_intent_generation(),
            response: default_response_generation(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            endpoint: default_completion_endpoint(),
            api_key: None,
            model: default_completion_model(),
            api_version: default_api_version(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            provider: default_retrieval_provider(),
            endpoint: None,
            api_key: None,
            api_version: default_search_api_version(),
            collections: default_collections(),
            top_k: default_top_k(),
            id_field: default_id_field(),
            text_field: default_text_field(),
            date_field: default_date_field(),
            memory_path: None,
            timeout_secs: default_retrieval_timeout(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            timeout_secs: default_classifier_timeout(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { image_route: default_image_route() }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { directory: default_image_directory() }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            prompts: PromptConfig::default(),
            completion: CompletionConfig::default(),
            retrieval: RetrievalConfig::default(),
            classifier: ClassifierConfig::default(),
            tokens: TokenConfig::default(),
            links: LinkConfig::default(),
            images: ImageConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__COMPLETION__API_KEY=sk-...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("retrieval.collections")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate the whole configuration.
    ///
    /// Called once at startup; any failure is fatal.
    pub fn validate(&self) -> Result<()> {
        self.prompts.validate()?;

        require_identifier("completion.provider", &self.completion.provider)?;
        require_identifier("completion.endpoint", &self.completion.endpoint)?;
        require_identifier("completion.model", &self.completion.model)?;
        match self.completion.provider.as_str() {
            "openai" | "azure" => require_secret("completion.api_key", &self.completion.api_key)?,
            other => return Err(config_error(format!("unknown completion provider: {}", other))),
        }
        if self.completion.provider == "azure" {
            require_identifier("completion.api_version", &self.completion.api_version)?;
        }

        if self.retrieval.collections.is_empty() {
            return Err(config_error("retrieval.collections must name at least one collection"));
        }
        for collection in &self.retrieval.collections {
            require_identifier("retrieval.collections[]", collection)?;
        }
        if self.retrieval.top_k == 0 {
            return Err(config_error("retrieval.top_k must be positive"));
        }

        let timeouts = [
            ("server.request_timeout_secs", self.server.request_timeout_secs),
            ("completion.timeout_secs", self.completion.timeout_secs),
            ("retrieval.timeout_secs", self.retrieval.timeout_secs),
            ("classifier.timeout_secs", self.classifier.timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(config_error(format!("{} must be positive", name)));
            }
        }
        match self.retrieval.provider.as_str() {
            "search" => {
                let endpoint = self.retrieval.endpoint.as_deref().unwrap_or_default();
                require_identifier("retrieval.endpoint", endpoint)?;
                require_secret("retrieval.api_key", &self.retrieval.api_key)?;
                require_identifier("retrieval.id_field", &self.retrieval.id_field)?;
                require_identifier("retrieval.text_field", &self.retrieval.text_field)?;
                require_identifier("retrieval.date_field", &self.retrieval.date_field)?;
            }
            "memory" => {}
            other => return Err(config_error(format!("unknown retrieval provider: {}", other))),
        }

        match self.classifier.provider.as_str() {
            "keyword" | "completion" => {}
            other => return Err(config_error(format!("unknown classifier provider: {}", other))),
        }

        require_identifier("tokens.encoding", &self.tokens.encoding)?;
        if self.tokens.chars_per_token == 0 {
            return Err(config_error("tokens.chars_per_token must be positive"));
        }

        require_identifier("links.image_route", &self.links.image_route)?;
        if !self.links.image_route.starts_with('/') || !self.links.image_route.ends_with('/') {
            return Err(config_error("links.image_route must start and end with '/'"));
        }
        require_identifier("images.directory", &self.images.directory)?;

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion.timeout_secs)
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval.timeout_secs)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier.timeout_secs)
    }
}

impl PromptConfig {
    /// Validate budget limits and prompt texts
    pub fn validate(&self) -> Result<()> {
        if self.completion_token_limit == 0 || self.response_token_limit == 0 {
            return Err(config_error("prompts token limits must be positive"));
        }
        if self.response_token_limit >= self.completion_token_limit {
            return Err(config_error(
                "prompts.response_token_limit must be below prompts.completion_token_limit",
            ));
        }
        if !(0.0..=1.0).contains(&self.document_context_weight) {
            return Err(config_error("prompts.document_context_weight must be within [0, 1]"));
        }

        for (name, text) in [
            ("prompts.system_description", &self.system_description),
            ("prompts.system_intent", &self.system_intent),
            ("prompts.system_intent_continuation", &self.system_intent_continuation),
            ("prompts.system_response", &self.system_response),
            ("prompts.system_chat_continuation", &self.system_chat_continuation),
            ("prompts.intent_extraction_template", &self.intent_extraction_template),
            ("prompts.chat_prompt_template", &self.chat_prompt_template),
            ("prompts.knowledge_preamble", &self.knowledge_preamble),
            ("prompts.history_preamble", &self.history_preamble),
        ] {
            require_text(name, text)?;
        }

        Ok(())
    }

    /// Fixed text charged against the budget before intent extraction
    pub fn intent_overhead_text(&self) -> String {
        [
            self.system_description.as_str(),
            self.system_intent.as_str(),
            self.system_intent_continuation.as_str(),
        ]
        .join("\n")
    }

    /// Fixed text charged against the budget before context assembly
    pub fn context_overhead_text(&self) -> String {
        [
            self.system_description.as_str(),
            self.system_response.as_str(),
            self.system_chat_continuation.as_str(),
        ]
        .join("\n")
    }
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::Configuration { message: message.into() }
}

/// Identifiers and endpoints must be non-empty and already trimmed
fn require_identifier(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(config_error(format!("{} must not be empty", name)));
    }
    if value.trim() != value {
        return Err(config_error(format!("{} must not have surrounding whitespace", name)));
    }
    Ok(())
}

/// Prompt texts must contain something besides whitespace
fn require_text(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(config_error(format!("{} must not be blank", name)));
    }
    Ok(())
}

fn require_secret(name: &str, value: &Option<String>) -> Result<()> {
    match value.as_deref() {
        Some(secret) => require_identifier(name, secret),
        None => Err(config_error(format!("{} is required", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.completion.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.prompts.completion_token_limit, 4096);
        assert_eq!(config.retrieval.collections, vec!["embeddings".to_string()]);
        assert_eq!(config.links.image_route, "/images/");
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("completion.api_key"));
    }

    #[test]
    fn test_response_limit_must_fit() {
        let mut config = valid_config();
        config.prompts.response_token_limit = config.prompts.completion_token_limit;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let mut config = valid_config();
        config.prompts.document_context_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = valid_config();
        config.retrieval.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval.timeout_secs"));

        let mut config = valid_config();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.completion.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.classifier.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_untrimmed_collection_rejected() {
        let mut config = valid_config();
        config.retrieval.collections = vec![" embeddings".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let mut config = valid_config();
        config.prompts.system_response = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_provider_needs_endpoint() {
        let mut config = valid_config();
        config.retrieval.provider = "search".to_string();
        assert!(config.validate().is_err());

        config.retrieval.endpoint = Some("https://pictures.search.windows.net".to_string());
        config.retrieval.api_key = Some("search-key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overhead_texts_join_fragments() {
        let prompts = PromptConfig::default();
        let overhead = prompts.context_overhead_text();
        assert!(overhead.starts_with(&prompts.system_description));
        assert!(overhead.ends_with(&prompts.system_chat_continuation));
    }
}
