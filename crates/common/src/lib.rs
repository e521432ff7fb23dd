//! PicForge Common Library
//! 
//! Shared code for the PicForge chat services including:
//! - Chat request/response models and the conversation state
//! - Error types and handling
//! - Configuration management
//! - Token counting
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod tokens;

// Re-export commonly used types
pub use errors::{AppError, ErrorCode, Result};
pub use config::AppConfig;
pub use models::{ChatRequest, ChatResponse, ConversationState, MemoryQueryResult, SortType};
pub use tokens::TokenCounter;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default knowledge collection queried when none is configured
pub const DEFAULT_COLLECTION: &str = "embeddings";

/// Default token encoding used for budgets
pub const DEFAULT_ENCODING: &str = "cl100k_base";
