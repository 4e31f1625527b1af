//! Lock file data types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::license::License;
use crate::record::Validate;

/// Lifecycle state of an update attempt.
///
/// `Active` is the only state reachable from creation and the only one in
/// which job messages are accepted. Every other state is terminal, including
/// states this version does not know, which lock files written by other
/// versions may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LockState {
    Active,
    Done,
    Error,
    Other(String),
}

impl LockState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Other(state) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl From<String> for LockState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "ACTIVE" => Self::Active,
            "DONE" => Self::Done,
            "ERROR" => Self::Error,
            _ => Self::Other(state),
        }
    }
}

impl From<LockState> for String {
    fn from(state: LockState) -> Self {
        match state {
            LockState::Other(state) => state,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a message reported by the update job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Log,
    Success,
    Fail,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }
}

/// A log line reported by the update job, or written by the lock itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub kind: MessageKind,
    /// Milliseconds since the Unix epoch. Any non-negative number is accepted.
    pub timestamp: f64,
    pub message: String,
}

impl JobMessage {
    pub fn new(kind: MessageKind, timestamp: f64, message: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp,
            message: message.into(),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Log, chrono::Utc::now().timestamp_millis() as f64, message)
    }

    /// Checks the fields the type system cannot.
    pub fn check(&self) -> Result<(), String> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(format!("invalid timestamp: {}", self.timestamp));
        }
        if self.message.is_empty() {
            return Err("message must not be empty".to_string());
        }
        Ok(())
    }
}

/// On-disk representation of a lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub lock_id: String,
    pub state: LockState,
    pub license: License,
    pub logs: Vec<JobMessage>,
}

impl Validate for LockRecord {
    fn validate(&self) -> Result<(), String> {
        if self.lock_id.is_empty() {
            return Err("lock file does not define a valid lockId".to_string());
        }
        if self.state.as_str().is_empty() {
            return Err("lock file does not define a valid state".to_string());
        }
        Ok(())
    }
}
