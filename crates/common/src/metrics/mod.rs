//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the chat pipeline and its collaborators
//! with standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all PicForge metrics
pub const METRICS_PREFIX: &str = "picforge";

/// Histogram buckets for HTTP and pipeline latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for completion latency; model calls run to the completion timeout
pub const COMPLETION_BUCKETS: &[f64] = &[0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 30.0, 60.0, 90.0];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Chat metrics
    describe_counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat runs by outcome"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end chat run latency in seconds"
    );

    describe_histogram!(
        format!("{}_pipeline_stage_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Latency of each pipeline stage in seconds"
    );

    describe_counter!(
        format!("{}_pipeline_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Chat runs that failed, by stage and error code"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_retrieval_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Knowledge collection queries by status"
    );

    describe_gauge!(
        format!("{}_retrieval_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from the last collection query"
    );

    // Completion metrics
    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Language model calls by purpose and status"
    );

    describe_histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language model call latency in seconds"
    );

    // Context metrics
    describe_counter!(
        format!("{}_classification_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Sort classifications that fell back to unsorted"
    );

    describe_gauge!(
        format!("{}_context_budget_tokens", METRICS_PREFIX),
        Unit::Count,
        "Token budget computed for each context section"
    );

    describe_counter!(
        format!("{}_links_rewritten_total", METRICS_PREFIX),
        Unit::Count,
        "Image references rewritten into links"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record the end of a chat run. `outcome` is "done" or "failed".
pub fn record_chat(duration_secs: f64, outcome: &str) {
    counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(format!("{}_chat_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

pub fn record_stage(stage: &str, duration_secs: f64) {
    histogram!(
        format!("{}_pipeline_stage_duration_seconds", METRICS_PREFIX),
        "stage" => stage.to_string()
    )
    .record(duration_secs);
}

pub fn record_pipeline_failure(stage: &str, code: u16) {
    counter!(
        format!("{}_pipeline_failures_total", METRICS_PREFIX),
        "stage" => stage.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Helper to record one collection query
pub fn record_retrieval(collection: &str, result_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_retrieval_requests_total", METRICS_PREFIX),
        "collection" => collection.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        gauge!(
            format!("{}_retrieval_results_count", METRICS_PREFIX),
            "collection" => collection.to_string()
        )
        .set(result_count as f64);
    }
}

/// Helper to record one language model call
pub fn record_completion(duration_secs: f64, purpose: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        "purpose" => purpose.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        "purpose" => purpose.to_string()
    )
    .record(duration_secs);
}

pub fn record_classification_fallback() {
    counter!(format!("{}_classification_fallbacks_total", METRICS_PREFIX)).increment(1);
}

pub fn record_budget(section: &str, tokens: i64) {
    gauge!(
        format!("{}_context_budget_tokens", METRICS_PREFIX),
        "section" => section.to_string()
    )
    .set(tokens as f64);
}

pub fn record_links_rewritten(count: usize) {
    if count > 0 {
        counter!(format!("{}_links_rewritten_total", METRICS_PREFIX)).increment(count as u64);
    }
}
