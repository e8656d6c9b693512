//! Metrics and observability utilities
//!
//! Metrics go through the `metrics` facade with standardized naming; the
//! binary decides whether a Prometheus exporter is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PDFChat metrics
pub const METRICS_PREFIX: &str = "pdfchat";

/// Buckets for language model latency (in seconds)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Buckets for embedding latency
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents ingested, by outcome"
    );

    describe_counter!(
        format!("{}_passages_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total passages embedded and indexed"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document ingestion and indexing latency in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Question metrics
    describe_counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions, by outcome (answered, degraded, error)"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language model call latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Outcome label for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Answered,
    Degraded,
    Error,
}

impl QuestionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionOutcome::Answered => "answered",
            QuestionOutcome::Degraded => "degraded",
            QuestionOutcome::Error => "error",
        }
    }
}

/// Helper to time a pipeline stage
pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, passages_indexed: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    if success {
        counter!(format!("{}_passages_indexed_total", METRICS_PREFIX))
            .increment(passages_indexed as u64);

        histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX))
            .record(duration_secs);
    }
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }

    tracing::trace!(model, batch_size, success, "embedding recorded");
}

/// Helper to record a finished question
pub fn record_question(outcome: QuestionOutcome) {
    counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Helper to record language model latency
pub fn record_generation(duration_secs: f64, model: &str) {
    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}
