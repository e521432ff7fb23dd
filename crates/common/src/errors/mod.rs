//! Error types for PicForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each collaborator failure mode
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    ImageNotFound,

    // External service errors (8xxx)
    UpstreamError,
    CompletionError,
    CompletionTimeout,
    RetrievalError,
    ClassificationError,
    CollaboratorTimeout,
    RequestCancelled,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ImageNotFound => 4002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::CompletionError => 8002,
            ErrorCode::CompletionTimeout => 8003,
            ErrorCode::RetrievalError => 8004,
            ErrorCode::ClassificationError => 8005,
            ErrorCode::CollaboratorTimeout => 8006,
            ErrorCode::RequestCancelled => 8007,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Image not found: {name}")]
    ImageNotFound { name: String },

    // Collaborator errors
    #[error("Completion failed: {message}")]
    Completion { message: String },

    #[error("Completion timed out after {timeout_ms}ms")]
    CompletionTimeout { timeout_ms: u64 },

    #[error("Retrieval from collection {collection} failed: {message}")]
    Retrieval { collection: String, message: String },

    #[error("Classification failed: {message}")]
    Classification { message: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Request cancelled")]
    Cancelled,

    /// Caller-facing wrapper for a failed chat run. Carries only the
    /// classification of the underlying failure, never its text.
    #[error("The assistant could not answer this request")]
    ChatFailed { code: ErrorCode },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ImageNotFound { .. } => ErrorCode::ImageNotFound,
            AppError::Completion { .. } => ErrorCode::CompletionError,
            AppError::CompletionTimeout { .. } => ErrorCode::CompletionTimeout,
            AppError::Retrieval { .. } => ErrorCode::RetrievalError,
            AppError::Classification { .. } => ErrorCode::ClassificationError,
            AppError::Timeout { .. } => ErrorCode::CollaboratorTimeout,
            AppError::Cancelled => ErrorCode::RequestCancelled,
            AppError::ChatFailed { code } => *code,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::ImageNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Completion { .. } |
            AppError::Retrieval { .. } |
            AppError::Classification { .. } |
            AppError::ChatFailed { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::CompletionTimeout { .. } |
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 503 Service Unavailable
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether a request can continue after this error.
    ///
    /// Retrieval and classification failures degrade to an empty or neutral
    /// result; everything else aborts the chat run.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            AppError::Retrieval { .. } | AppError::Classification { .. } | AppError::Timeout { .. }
        )
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ImageNotFound { name: "cat.jpg".into() };
        assert_eq!(err.code(), ErrorCode::ImageNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_completion_error_is_fatal() {
        let err = AppError::Completion {
            message: "model overloaded".into(),
        };
        assert_eq!(err.code(), ErrorCode::CompletionError);
        assert!(!err.is_degradable());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_retrieval_and_classification_degrade() {
        let retrieval = AppError::Retrieval {
            collection: "embeddings".into(),
            message: "503".into(),
        };
        let classification = AppError::Classification { message: "bad label".into() };
        assert!(retrieval.is_degradable());
        assert!(classification.is_degradable());
    }

    #[test]
    fn test_chat_failed_hides_cause() {
        let err = AppError::ChatFailed { code: ErrorCode::CompletionTimeout };
        assert_eq!(err.code(), ErrorCode::CompletionTimeout);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.to_string().contains("timed out"));
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Input is empty".into(),
            field: Some("input".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }
}
