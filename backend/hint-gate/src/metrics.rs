use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

use crate::models::Decision;

lazy_static! {
    pub static ref HINT_GATE_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hint_gate_decisions_total",
        "Hint requests evaluated, by outcome (allowed or rejection reason)",
        &["outcome"]
    )
    .unwrap();

    pub static ref HINT_LEVELS_GRANTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hint_levels_granted_total",
        "Hint levels unlocked",
        &["hint_level"]
    )
    .unwrap();

    pub static ref HINT_GATE_COMMIT_CONFLICTS_TOTAL: IntCounter = register_int_counter!(
        "hint_gate_commit_conflicts_total",
        "Commits that lost a race on the same attempt record and were re-evaluated"
    )
    .unwrap();

    pub static ref ATTEMPT_STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "attempt_store_operations_total",
        "Total number of attempt store operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref ATTEMPT_STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "attempt_store_operation_duration_seconds",
        "Attempt store operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0, 2.0]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

pub fn record_decision(decision: &Decision) {
    HINT_GATE_DECISIONS_TOTAL
        .with_label_values(&[decision.outcome()])
        .inc();

    if decision.allowed {
        HINT_LEVELS_GRANTED_TOTAL
            .with_label_values(&[decision.hint_level.to_string().as_str()])
            .inc();
    }
}

/// Helper: track attempt store operation with metrics
pub async fn track_store_operation<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    ATTEMPT_STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    ATTEMPT_STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}
