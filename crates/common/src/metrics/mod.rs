//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperBase metrics
pub const METRICS_PREFIX: &str = "paperbase";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

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

    // Catalog operations
    describe_counter!(
        format!("{}_catalog_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Catalog operations by entity, operation and outcome"
    );

    describe_histogram!(
        format!("{}_catalog_operation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog operation latency in seconds"
    );

    // Author matching
    describe_counter!(
        format!("{}_author_resolutions_total", METRICS_PREFIX),
        Unit::Count,
        "Author descriptions resolved to an existing row or a new one"
    );

    // Integrity
    describe_counter!(
        format!("{}_author_deletions_blocked_total", METRICS_PREFIX),
        Unit::Count,
        "Author deletions rejected because a paper would lose its last author"
    );

    describe_counter!(
        format!("{}_units_of_work_aborted_total", METRICS_PREFIX),
        Unit::Count,
        "Transactions rolled back"
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

/// Times one catalog operation; call [`OperationTimer::finish`] with the outcome
pub struct OperationTimer {
    start: Instant,
    entity: &'static str,
    operation: &'static str,
}

impl OperationTimer {
    pub fn start(entity: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            entity,
            operation,
        }
    }

    /// Record the outcome and return the result untouched
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        let outcome = if result.is_ok() { "ok" } else { "error" };

        counter!(
            format!("{}_catalog_operations_total", METRICS_PREFIX),
            "entity" => self.entity,
            "operation" => self.operation,
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            format!("{}_catalog_operation_duration_seconds", METRICS_PREFIX),
            "entity" => self.entity,
            "operation" => self.operation
        )
        .record(self.start.elapsed().as_secs_f64());

        result
    }
}

/// Helper to record matcher outcomes
pub fn record_author_resolution(matched: usize, created: usize) {
    counter!(
        format!("{}_author_resolutions_total", METRICS_PREFIX),
        "outcome" => "matched"
    )
    .increment(matched as u64);

    counter!(
        format!("{}_author_resolutions_total", METRICS_PREFIX),
        "outcome" => "created"
    )
    .increment(created as u64);
}

pub fn record_deletion_blocked() {
    counter!(format!("{}_author_deletions_blocked_total", METRICS_PREFIX)).increment(1);
}

pub fn record_unit_of_work_aborted() {
    counter!(format!("{}_units_of_work_aborted_total", METRICS_PREFIX)).increment(1);
}
