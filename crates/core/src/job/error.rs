//! Error types for the job module.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while starting or cleaning up an update job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The descriptor is missing required values.
    #[error("Invalid job descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    /// kubectl binary not found.
    #[error("kubectl not found at path: {path}")]
    KubectlNotFound { path: PathBuf },

    /// kubectl exited with a failure status.
    #[error("{action} failed: {reason}")]
    CommandFailed {
        action: String,
        reason: String,
        stderr: Option<String>,
    },

    /// Failed to render a resource document.
    #[error("Failed to render {resource}: {reason}")]
    Render { resource: String, reason: String },

    /// I/O error while talking to kubectl.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }

    pub fn command_failed(
        action: impl Into<String>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::CommandFailed {
            action: action.into(),
            reason: reason.into(),
            stderr,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDescriptor { .. } => ErrorKind::InvalidArgument,
            _ => ErrorKind::Launch,
        }
    }
}
