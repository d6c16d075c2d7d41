// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, ADMISSION_PERMITS, CACHE_ENTRIES, CACHE_OPERATIONS, REGISTRY, RETRY_ATTEMPTS,
    STREAM_CHUNKS, TRANSPORT_CALLS, TRANSPORT_DURATION,
};

/// Helper to record a finished transport attempt
pub fn record_transport_call(operation: &str, outcome: &str, duration_secs: f64) {
    TRANSPORT_CALLS
        .with_label_values(&[operation, outcome])
        .inc();

    TRANSPORT_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

pub fn record_retry(operation: &str) {
    RETRY_ATTEMPTS.with_label_values(&[operation]).inc();
}

/// Helper to record cache operations
pub fn record_cache_op(op: &str) {
    CACHE_OPERATIONS.with_label_values(&[op]).inc();
}

pub fn record_cache_op_by(op: &str, count: u64) {
    CACHE_OPERATIONS.with_label_values(&[op]).inc_by(count as f64);
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["live"]).set(count as f64);
}

/// Helper to publish admission gate occupancy
pub fn update_admission(in_use: usize, waiting: usize) {
    ADMISSION_PERMITS
        .with_label_values(&["in_use"])
        .set(in_use as f64);
    ADMISSION_PERMITS
        .with_label_values(&["waiting"])
        .set(waiting as f64);
}

pub fn record_stream_chunk(kind: &str) {
    STREAM_CHUNKS.with_label_values(&[kind]).inc();
}
