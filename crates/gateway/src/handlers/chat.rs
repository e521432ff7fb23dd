//! Chat handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::AppState;
use picforge_common::{
    errors::{AppError, Result},
    models::Variable,
    ChatRequest, ChatResponse,
};
use picforge_context::ChatOutcome;

/// Chat request body as sent by the web client
#[derive(Debug, Deserialize, Validate)]
pub struct ChatBody {
    #[serde(rename = "Input", alias = "input", default)]
    #[validate(length(min = 1, message = "Input must not be empty"))]
    pub input: String,

    #[serde(rename = "Variables", alias = "variables", default)]
    #[validate(length(max = 64, message = "Too many variables"))]
    pub variables: Vec<Variable>,
}

impl From<ChatBody> for ChatRequest {
    fn from(body: ChatBody) -> Self {
        ChatRequest {
            input: body.input,
            variables: body.variables,
        }
    }
}

/// Answer one chat turn
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();

    body.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("Input".to_string()),
    })?;

    let max_chars = state.config.server.max_input_chars;
    if body.input.chars().count() > max_chars {
        return Err(AppError::Validation {
            message: format!("Input exceeds {} characters", max_chars),
            field: Some("Input".to_string()),
        });
    }

    let request = ChatRequest::from(body);

    // A dropped handler (client disconnect) cancels outstanding collaborator calls
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let timeout = state.config.request_timeout();
    let outcome = tokio::time::timeout(timeout, state.pipeline.run(&request, &cancel))
        .await
        .map_err(|_| AppError::Timeout {
            operation: "chat".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?;

    match outcome {
        ChatOutcome::Done(response) => {
            tracing::info!(
                latency_ms = start.elapsed().as_millis() as u64,
                links = response.variable("link").map_or(0, |l| l.lines().count()),
                "Chat completed"
            );
            Ok(Json(response))
        }
        ChatOutcome::Failed(failed) => Err(AppError::ChatFailed {
            code: failed.error.code(),
        }),
    }
}
