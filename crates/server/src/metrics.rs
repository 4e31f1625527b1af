//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the updater server:
//! - HTTP request metrics (latency, counts)
//! - Whether an update is in progress (collected dynamically)
//! - Core update metrics registered from `updater_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "updater_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("updater_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "updater_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Update Metrics
// =============================================================================

/// 1 while an update holds the lock (collected dynamically).
pub static UPDATE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("updater_update_active", "Whether an update is in progress").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Update
    registry.register(Box::new(UPDATE_ACTIVE.clone())).unwrap();

    // Core metrics (launches, notifications, cleanup)
    for metric in updater_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the lock on disk.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.orchestrator().status().await {
        Ok(status) => UPDATE_ACTIVE.set(i64::from(status.is_some_and(|s| !s.stale))),
        Err(e) => error!(error = %e, "Failed to read update status for metrics"),
    }
}

/// Normalize a request path for use as a metric label.
///
/// Lock ids in notify callbacks are replaced with `{lock_id}` so each update
/// does not create its own label set.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    for i in 1..segments.len() {
        if segments[i - 1] == "notify" && !segments[i].is_empty() {
            segments[i] = "{lock_id}";
        }
    }
    segments.join("/")
}
