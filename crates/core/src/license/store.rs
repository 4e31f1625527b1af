//! The installed-license record.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::error::ErrorKind;
use crate::manifest::{ManifestDiffer, UpdateManifest};
use crate::record::{JsonRecord, RecordError, Validate, WriteMode};

use super::types::License;

/// File name of the installed license within the license directory.
pub const LICENSE_FILE_NAME: &str = "_license";

/// Errors raised by [`LicenseStore`].
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("license does not conform to expected schema: {reason}")]
    Corrupt { reason: String },

    #[error("error reading license file")]
    Read(#[source] RecordError),

    #[error("error writing license file")]
    Write(#[source] RecordError),
}

impl LicenseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::Read(_) => ErrorKind::Read,
            Self::Write(_) => ErrorKind::Write,
        }
    }
}

/// Holds what is installed on the server right now.
///
/// The snapshot starts out empty; call [`load`](Self::load) to populate it
/// from disk.
#[derive(Debug)]
pub struct LicenseStore {
    file: JsonRecord<License>,
    differ: ManifestDiffer,
    data: License,
}

impl LicenseStore {
    pub fn new(license_dir: impl AsRef<Path>, differ: ManifestDiffer) -> Self {
        Self {
            file: JsonRecord::new(license_dir, LICENSE_FILE_NAME),
            differ,
            data: License::empty(),
        }
    }

    /// Current snapshot.
    pub fn data(&self) -> &License {
        &self.data
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the persisted license. A missing file yields an empty license.
    pub async fn load(&mut self) -> Result<(), LicenseError> {
        match self.file.read_optional().await {
            Ok(Some(license)) => {
                debug!(
                    path = %self.file.path().display(),
                    components = license.components.len(),
                    "Loaded installed license"
                );
                self.data = license;
                Ok(())
            }
            Ok(None) => {
                warn!(
                    path = %self.file.path().display(),
                    "License file does not exist, assuming nothing is installed"
                );
                self.data = License::empty();
                Ok(())
            }
            Err(e @ (RecordError::Parse { .. } | RecordError::Schema { .. })) => {
                error!(error = %e, "Installed license is corrupt");
                Err(LicenseError::Corrupt {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                error!(error = %e, "Error reading license file");
                Err(LicenseError::Read(e))
            }
        }
    }

    /// Persists the current snapshot.
    pub async fn save(&self) -> Result<(), LicenseError> {
        trace!(path = %self.file.path().display(), "Writing license file");
        self.file
            .write(&self.data, WriteMode::Overwrite)
            .await
            .map_err(|e| {
                error!(error = %e, "Error writing license file");
                LicenseError::Write(e)
            })
    }

    /// Validates and replaces the snapshot.
    pub fn set_data(&mut self, license: License) -> Result<(), LicenseError> {
        check_license(&license)?;
        self.data = license;
        Ok(())
    }

    /// Diffs `desired` against the current snapshot.
    pub fn generate_update_manifest(
        &self,
        desired: &License,
    ) -> Result<UpdateManifest, LicenseError> {
        check_license(desired)?;
        Ok(self
            .differ
            .diff(&self.data.components, &desired.components))
    }
}

fn check_license(license: &License) -> Result<(), LicenseError> {
    license.validate().map_err(|reason| {
        error!(reason = %reason, "Error validating license data");
        LicenseError::Corrupt { reason }
    })
}
