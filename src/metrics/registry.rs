// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry, CounterVec, Encoder, GaugeVec, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // TRANSPORT METRICS
    // ============================================================================

    /// Total transport calls by operation and outcome
    pub static ref TRANSPORT_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gemguard_transport_calls_total", "Total transport calls"),
        &["operation", "outcome"],
        REGISTRY
    ).unwrap();

    /// Transport call duration (per attempt)
    pub static ref TRANSPORT_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("gemguard_transport_duration_seconds", "Transport call duration")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["operation"],
        REGISTRY
    ).unwrap();

    /// Retries scheduled after a retryable failure
    pub static ref RETRY_ATTEMPTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gemguard_retry_attempts_total", "Retries scheduled after a retryable failure"),
        &["operation"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations (hit, miss, set, evict, expire, error)
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gemguard_cache_operations_total", "Response cache operations"),
        &["op"],
        REGISTRY
    ).unwrap();

    /// Live cache entries
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("gemguard_cache_entries", "Live response cache entries"),
        &["state"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // ADMISSION METRICS
    // ============================================================================

    /// Admission permits (in_use, waiting)
    pub static ref ADMISSION_PERMITS: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("gemguard_admission_permits", "Admission gate permits"),
        &["state"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // STREAMING METRICS
    // ============================================================================

    /// Stream chunks delivered to callers
    pub static ref STREAM_CHUNKS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gemguard_stream_chunks_total", "Stream chunks delivered"),
        &["kind"],
        REGISTRY
    ).unwrap();
}

/// Render all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
