//! Metrics and observability utilities
//!
//! Prometheus metric names share the `folio` prefix. The gateway installs
//! the exporter; everything here only records.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Folio metrics
pub const METRICS_PREFIX: &str = "folio";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Buckets for chat turns, dominated by the completion call
pub const CHAT_BUCKETS: &[f64] = &[
    0.250, 0.500, 1.000, 2.000, 4.000, 8.000, 15.00, 30.00, 60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_http_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_http_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total twin chat requests"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Twin answer latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    describe_counter!(
        format!("{}_chunks_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Knowledge chunks written to the index"
    );

    describe_counter!(
        format!("{}_chunks_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Knowledge chunks that failed to embed or insert"
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
            format!("{}_http_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_http_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one twin chat turn
pub fn record_chat(duration_secs: f64, model: &str, citations: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status,
        "cited" => if citations > 0 { "yes" } else { "no" }
    )
    .increment(1);

    histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Record one embedding API call
pub fn record_embedding(model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if !success {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(batch_size as u64);
    }
}

/// Record the outcome of indexing one or more sources
pub fn record_indexing(source_type: &str, inserted: usize, failed: usize) {
    counter!(
        format!("{}_chunks_indexed_total", METRICS_PREFIX),
        "source_type" => source_type.to_string()
    )
    .increment(inserted as u64);

    if failed > 0 {
        counter!(
            format!("{}_chunks_failed_total", METRICS_PREFIX),
            "source_type" => source_type.to_string()
        )
        .increment(failed as u64);
    }
}
