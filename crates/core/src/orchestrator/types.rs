//! Types for the update orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::credential::CredentialError;
use crate::error::ErrorKind;
use crate::job::JobError;
use crate::license::LicenseError;
use crate::lock::{LockError, LockState};

/// Errors that can occur while launching or tracking an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An update is already in progress.
    #[error("cannot create lock, an update is already in progress (lock {lock_id})")]
    Conflict { lock_id: String },

    /// Messages addressed to a lock other than the active one.
    #[error("lock id mismatch: messages for {requested} do not apply to current lock {current}")]
    LockMismatch { current: String, requested: String },

    /// The active lock no longer accepts messages.
    #[error("lock is not ACTIVE, current state: {state}")]
    InvalidState { state: LockState },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    License(#[from] LicenseError),

    #[error("error fetching software update token")]
    Credential(#[from] CredentialError),

    #[error("error starting software update job")]
    Launch(#[source] JobError),

    /// The task running the operation was cancelled (runtime shutdown).
    #[error("update task interrupted: {0}")]
    Interrupted(String),
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Conflict { .. } | Self::LockMismatch { .. } | Self::InvalidState { .. } => {
                ErrorKind::Conflict
            }
            Self::Lock(e) => e.kind(),
            Self::License(e) => e.kind(),
            Self::Credential(_) => ErrorKind::Credential,
            Self::Launch(_) => ErrorKind::Launch,
            Self::Interrupted(_) => ErrorKind::NotAvailable,
        }
    }
}

/// Result of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOutcome {
    pub lock_id: String,
    pub state: LockState,
}

/// Snapshot of the update in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub lock_id: String,
    pub state: LockState,
    /// The lock left `ACTIVE` but was not retired yet.
    pub stale: bool,
    pub log_count: usize,
    pub components: usize,
}
