//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Update launches
//! - Job notifications and finished updates
//! - Best-effort cleanup failures

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};

// =============================================================================
// Orchestrator - Launch Metrics
// =============================================================================

/// Update launches by result.
pub static UPDATE_LAUNCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("updater_launches_total", "Total update launch attempts"),
        &["result"], // "started", "conflict", "failed"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator - Notify Metrics
// =============================================================================

/// Job messages received by kind.
pub static NOTIFY_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "updater_notify_messages_total",
            "Job messages applied to the active lock",
        ),
        &["kind"], // "log", "success", "fail"
    )
    .unwrap()
});

/// Updates that reached a terminal state.
pub static UPDATES_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("updater_updates_finished_total", "Updates that finished"),
        &["state"], // "DONE", "ERROR"
    )
    .unwrap()
});

/// Best-effort cleanup failures.
pub static CLEANUP_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "updater_cleanup_failures_total",
            "Failures while cleaning up after an update",
        ),
        &["target"], // "lock", "job"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(UPDATE_LAUNCHES.clone()),
        Box::new(NOTIFY_MESSAGES.clone()),
        Box::new(UPDATES_FINISHED.clone()),
        Box::new(CLEANUP_FAILURES.clone()),
    ]
}
