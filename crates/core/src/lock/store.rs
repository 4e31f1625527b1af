//! Crash-safe lock file.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, trace};

use crate::error::ErrorKind;
use crate::license::License;
use crate::record::{JsonRecord, RecordError, WriteMode};

use super::types::{JobMessage, LockRecord, LockState};

/// File name of the active lock within the lock directory.
pub const LOCK_FILE_NAME: &str = "_lock";

/// Errors raised by [`Lock`].
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock already initialized")]
    AlreadyInitialized,

    #[error("lock not initialized")]
    NotInitialized,

    #[error("lock is no longer available")]
    NotAvailable,

    #[error("cannot create lock, lock file already exists: {path}")]
    Exists { path: PathBuf },

    #[error("lock file does not exist: {path}")]
    Missing { path: PathBuf },

    #[error("error reading lock file")]
    Read(#[source] RecordError),

    #[error("lock file is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("error writing to lock file")]
    Write(#[source] RecordError),
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized | Self::Exists { .. } | Self::Missing { .. } => {
                ErrorKind::Conflict
            }
            Self::NotInitialized | Self::NotAvailable => ErrorKind::NotAvailable,
            Self::Read(_) => ErrorKind::Read,
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::Write(_) => ErrorKind::Write,
        }
    }
}

/// Durable record of an update attempt.
///
/// The lock file is created with an exclusive create, which makes it the only
/// cross-process guard against two concurrent updates. In-memory mutations
/// (`add_log`, `update_state`) only reach disk through [`save`](Self::save).
/// After [`cleanup`](Self::cleanup) the file is archived under the lock id and
/// every further operation fails with [`LockError::NotAvailable`].
#[derive(Debug)]
pub struct Lock {
    file: JsonRecord<LockRecord>,
    data: Option<LockRecord>,
    created_id: Option<String>,
    cleaned_up: bool,
}

impl Lock {
    pub fn new(lock_dir: impl AsRef<Path>) -> Self {
        Self {
            file: JsonRecord::new(lock_dir, LOCK_FILE_NAME),
            data: None,
            created_id: None,
            cleaned_up: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Initialized and not cleaned up.
    pub fn is_ready(&self) -> bool {
        self.data.is_some() && !self.cleaned_up
    }

    pub fn lock_id(&self) -> Result<&str, LockError> {
        Ok(&self.record()?.lock_id)
    }

    pub fn state(&self) -> Result<LockState, LockError> {
        Ok(self.record()?.state.clone())
    }

    pub fn license(&self) -> Result<&License, LockError> {
        Ok(&self.record()?.license)
    }

    pub fn logs(&self) -> Result<&[JobMessage], LockError> {
        Ok(&self.record()?.logs)
    }

    /// Writes a fresh `ACTIVE` lock file for `license`.
    ///
    /// Fails with [`LockError::Exists`] when another lock file is present.
    /// The in-memory fields are populated by a subsequent [`init`](Self::init).
    pub async fn create(&mut self, license: &License) -> Result<(), LockError> {
        if self.cleaned_up {
            return Err(LockError::NotAvailable);
        }
        if self.data.is_some() || self.created_id.is_some() {
            return Err(LockError::AlreadyInitialized);
        }

        let record = LockRecord {
            lock_id: uuid::Uuid::new_v4().simple().to_string(),
            state: LockState::Active,
            license: license.clone(),
            logs: vec![JobMessage::log("Lock created")],
        };

        trace!(path = %self.path().display(), lock_id = %record.lock_id, "Creating lock file");
        self.file
            .write(&record, WriteMode::CreateNew)
            .await
            .map_err(|e| match e {
                RecordError::AlreadyExists { path } => LockError::Exists { path },
                other => {
                    error!(error = %other, "Error writing to lock file");
                    LockError::Write(other)
                }
            })?;

        debug!(lock_id = %record.lock_id, "Lock file created");
        self.created_id = Some(record.lock_id);
        Ok(())
    }

    /// Loads the lock file into memory. A no-op when already initialized.
    pub async fn init(&mut self) -> Result<(), LockError> {
        if self.cleaned_up {
            return Err(LockError::NotAvailable);
        }
        if self.data.is_some() {
            return Ok(());
        }

        let record = self.file.read().await.map_err(|e| match e {
            RecordError::NotFound { path } => LockError::Missing { path },
            e @ (RecordError::Parse { .. } | RecordError::Schema { .. }) => {
                error!(error = %e, "Lock file is corrupt");
                LockError::Corrupt {
                    reason: e.to_string(),
                }
            }
            other => {
                error!(error = %other, "Error reading lock file");
                LockError::Read(other)
            }
        })?;

        trace!(lock_id = %record.lock_id, state = %record.state, "Lock initialized from file");
        self.data = Some(record);
        Ok(())
    }

    /// Appends a copy of `message` to the in-memory log.
    pub fn add_log(&mut self, message: &JobMessage) -> Result<(), LockError> {
        self.record_mut()?.logs.push(message.clone());
        Ok(())
    }

    /// Changes the in-memory state.
    pub fn update_state(&mut self, state: LockState) -> Result<(), LockError> {
        let record = self.record_mut()?;
        trace!(lock_id = %record.lock_id, from = %record.state, to = %state, "Updating lock state");
        record.state = state;
        Ok(())
    }

    /// Overwrites the lock file with the in-memory fields.
    pub async fn save(&self) -> Result<(), LockError> {
        let record = self.record()?;
        self.file
            .write(record, WriteMode::Overwrite)
            .await
            .map_err(|e| {
                error!(error = %e, "Error writing to lock file");
                LockError::Write(e)
            })
    }

    /// Archives the lock file under its lock id and retires this object.
    pub async fn cleanup(&mut self) -> Result<(), LockError> {
        if self.cleaned_up {
            return Err(LockError::NotAvailable);
        }
        let lock_id = match (&self.data, &self.created_id) {
            (Some(record), _) => record.lock_id.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => return Err(LockError::NotInitialized),
        };

        trace!(lock_id = %lock_id, "Cleaning up lock file");
        self.file.archive(&lock_id).await.map_err(|e| {
            error!(error = %e, "Error cleaning up lock file");
            LockError::Write(e)
        })?;

        self.cleaned_up = true;
        debug!(lock_id = %lock_id, "Lock file archived");
        Ok(())
    }

    fn record(&self) -> Result<&LockRecord, LockError> {
        if self.cleaned_up {
            return Err(LockError::NotAvailable);
        }
        self.data.as_ref().ok_or(LockError::NotInitialized)
    }

    fn record_mut(&mut self) -> Result<&mut LockRecord, LockError> {
        if self.cleaned_up {
            return Err(LockError::NotAvailable);
        }
        self.data.as_mut().ok_or(LockError::NotInitialized)
    }
}
