//! Update orchestrator.
//!
//! Single entry point for starting an update and receiving progress from the
//! update job. Both entry points run under one FIFO mutex, so no two calls ever
//! interleave their changes to the active lock:
//! - **launch_update**: create lock, diff licenses, fetch token, start job
//! - **notify**: apply job messages, install the license on success, clean up
//!   once the lock leaves `ACTIVE`

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::UpdateOrchestrator;
pub use types::{LaunchOutcome, UpdateError, UpdateStatus};
