//! JSON documents persisted as single files.
//!
//! Both the lock and the license are stored as one JSON object per file. This
//! module owns the read/validate/write cycle for such files:
//!
//! - Reads separate a missing file from I/O failures, malformed JSON and
//!   schema violations.
//! - [`WriteMode::CreateNew`] uses an exclusive create, so concurrent creators
//!   race on the filesystem and exactly one wins.
//! - [`WriteMode::Overwrite`] writes a sibling temp file and renames it over
//!   the target, so readers never observe a partially written document.

use std::io::ErrorKind as IoErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::trace;

use crate::error::ErrorKind;

/// Structural checks that go beyond what deserialization enforces.
pub trait Validate {
    /// Returns a human readable reason when the value is not acceptable.
    fn validate(&self) -> Result<(), String>;
}

/// Errors raised while reading or writing a record file.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read record file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse record file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("record file {path} does not conform to expected schema: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("record file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("failed to write record file: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::Read { .. } => ErrorKind::Read,
            Self::Parse { .. } | Self::Schema { .. } => ErrorKind::Corrupt,
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Write { .. } | Self::Serialize(_) => ErrorKind::Write,
        }
    }
}

/// How a record is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the file already exists.
    CreateNew,
    /// Atomically replace any existing file.
    Overwrite,
}

/// A typed JSON document stored at `<dir>/<file_name>`.
#[derive(Debug, Clone)]
pub struct JsonRecord<T> {
    dir: PathBuf,
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonRecord<T>
where
    T: Serialize + DeserializeOwned + Validate,
{
    pub fn new(dir: impl AsRef<Path>, file_name: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(file_name);
        Self {
            dir,
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads, parses and validates the record.
    pub async fn read(&self) -> Result<T, RecordError> {
        trace!(path = %self.path.display(), "Reading record file");
        let contents = fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                RecordError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                RecordError::Read {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        self.parse(&contents)
    }

    /// Like [`read`](Self::read), but a missing file yields `None`.
    pub async fn read_optional(&self) -> Result<Option<T>, RecordError> {
        match self.read().await {
            Ok(value) => Ok(Some(value)),
            Err(RecordError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parses and validates record contents that were already read.
    pub fn parse(&self, contents: &str) -> Result<T, RecordError> {
        let raw: serde_json::Value =
            serde_json::from_str(contents).map_err(|e| RecordError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let value: T = serde_json::from_value(raw).map_err(|e| RecordError::Schema {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        value.validate().map_err(|reason| RecordError::Schema {
            path: self.path.clone(),
            reason,
        })?;

        Ok(value)
    }

    /// Serializes the record and writes it according to `mode`.
    pub async fn write(&self, value: &T, mode: WriteMode) -> Result<(), RecordError> {
        let bytes = serde_json::to_vec(value).map_err(RecordError::Serialize)?;
        match mode {
            WriteMode::CreateNew => self.write_exclusive(&bytes).await,
            WriteMode::Overwrite => self.write_replace(&bytes).await,
        }
    }

    /// Renames the record file to `name` within the same directory.
    pub async fn archive(&self, name: &str) -> Result<PathBuf, RecordError> {
        let target = self.dir.join(name);
        trace!(from = %self.path.display(), to = %target.display(), "Archiving record file");
        fs::rename(&self.path, &target)
            .await
            .map_err(|e| RecordError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(target)
    }

    async fn write_exclusive(&self, bytes: &[u8]) -> Result<(), RecordError> {
        trace!(path = %self.path.display(), "Creating record file");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                if e.kind() == IoErrorKind::AlreadyExists {
                    RecordError::AlreadyExists {
                        path: self.path.clone(),
                    }
                } else {
                    self.write_error(e)
                }
            })?;

        file.write_all(bytes).await.map_err(|e| self.write_error(e))?;
        file.sync_all().await.map_err(|e| self.write_error(e))?;
        Ok(())
    }

    async fn write_replace(&self, bytes: &[u8]) -> Result<(), RecordError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp_path = self
            .dir
            .join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

        trace!(path = %self.path.display(), "Replacing record file");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_error(e))?;
        file.write_all(bytes).await.map_err(|e| self.write_error(e))?;
        file.sync_all().await.map_err(|e| self.write_error(e))?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.write_error(e));
        }
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> RecordError {
        RecordError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
