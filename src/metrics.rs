//! Prometheus metrics for the counter, cache connectivity, and HTTP surface.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, warn};

use crate::cache::ConnectivityState;
use crate::counter::StorageMode;

// === Metric Name Constants ===

/// Counter reads by storage mode.
pub const METRIC_COUNTER_READS: &str = "counter_reads_total";
/// Counter increments by outcome.
pub const METRIC_COUNTER_INCREMENTS: &str = "counter_increments_total";
/// Cache call failures by error kind.
pub const METRIC_CACHE_ERRORS: &str = "cache_errors_total";
/// Connectivity state transitions by target state.
pub const METRIC_CACHE_TRANSITIONS: &str = "cache_state_transitions_total";
/// Users created counter metric name.
pub const METRIC_USERS_CREATED: &str = "users_created_total";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(
        METRIC_COUNTER_READS,
        "Total counter reads, labelled by storage mode"
    );
    describe_counter!(
        METRIC_COUNTER_INCREMENTS,
        "Total counter increment requests, labelled by outcome"
    );
    describe_counter!(
        METRIC_CACHE_ERRORS,
        "Total cache call failures, labelled by error kind"
    );
    describe_counter!(
        METRIC_CACHE_TRANSITIONS,
        "Total cache connectivity transitions, labelled by target state"
    );
    describe_counter!(METRIC_USERS_CREATED, "Total number of users created");
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Record a counter read.
pub fn inc_counter_reads(mode: StorageMode) {
    counter!(METRIC_COUNTER_READS, "storage" => mode.to_string()).increment(1);
}

/// Record a counter increment request.
pub fn inc_counter_increments(outcome: &'static str) {
    counter!(METRIC_COUNTER_INCREMENTS, "outcome" => outcome).increment(1);
}

/// Record a failed cache call.
pub fn inc_cache_errors(kind: &'static str) {
    counter!(METRIC_CACHE_ERRORS, "kind" => kind).increment(1);
}

/// Record a connectivity transition.
pub fn inc_cache_transitions(to: ConnectivityState) {
    counter!(METRIC_CACHE_TRANSITIONS, "to" => to.to_string()).increment(1);
}

/// Increment users created counter.
pub fn inc_users_created() {
    counter!(METRIC_USERS_CREATED).increment(1);
}

/// Record HTTP request latency. `endpoint` must be a route template, not a
/// raw path, to keep the label set bounded.
pub fn record_http_latency(start: Instant, endpoint: String) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint).record(latency_ms);
}
