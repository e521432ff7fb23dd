//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub images: CheckResult,
    pub collections: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up() -> Self {
        Self { status: "up".to_string(), error: None }
    }

    fn down(error: impl Into<String>) -> Self {
        Self { status: "down".to_string(), error: Some(error.into()) }
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: picforge_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks local dependencies
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let images = match tokio::fs::metadata(&state.config.images.directory).await {
        Ok(meta) if meta.is_dir() => CheckResult::up(),
        Ok(_) => CheckResult::down("image path is not a directory"),
        Err(_) => CheckResult::down("image directory missing"),
    };

    let collections = if state.config.retrieval.collections.is_empty() {
        CheckResult::down("no knowledge collections configured")
    } else {
        CheckResult::up()
    };

    let all_healthy = images.status == "up" && collections.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { images, collections },
    })
}
