//! Failure categories shared by every component error.

use serde::Serialize;
use std::fmt;

/// Category of a failure, independent of which component raised it.
///
/// Component errors expose their category through a `kind()` method so that
/// callers (the HTTP layer in particular) can decide how to report a failure
/// without matching on every concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input to a public operation.
    InvalidArgument,
    /// On-disk data failed to parse or failed schema validation.
    Corrupt,
    /// I/O failure while reading (other than a missing file).
    Read,
    /// I/O failure while writing or renaming.
    Write,
    /// Incompatible state already exists (active update, lock mismatch, wrong state).
    Conflict,
    /// The object was retired and can no longer be used.
    NotAvailable,
    /// The credential token could not be obtained.
    Credential,
    /// The external update job could not be started or stopped.
    Launch,
    /// A license could not be loaded from its source.
    Load,
}

impl ErrorKind {
    /// Whether the failure was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument | Self::Conflict)
    }

    /// Whether the failure originated in an upstream collaborator.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, Self::Credential | Self::Launch | Self::Load)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Corrupt => "corrupt",
            Self::Read => "read",
            Self::Write => "write",
            Self::Conflict => "conflict",
            Self::NotAvailable => "not_available",
            Self::Credential => "credential",
            Self::Launch => "launch",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
