//! Orchestrator configuration.

use std::path::PathBuf;

use crate::config::Config;
use crate::manifest::DEFAULT_SECRET_PREFIX;

/// Configuration for the update orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory holding the lock file and archived locks.
    pub lock_dir: PathBuf,

    /// Directory holding the installed license file.
    pub license_dir: PathBuf,

    /// Base callback URL. The lock id is appended as a path segment.
    pub callback_endpoint: String,

    /// Passed through to the update agent unchanged.
    pub credential_provider_endpoint: String,

    /// Prefix of generated image pull secret names.
    pub secret_prefix: String,
}

impl OrchestratorConfig {
    pub fn new(
        lock_dir: impl Into<PathBuf>,
        license_dir: impl Into<PathBuf>,
        callback_endpoint: impl Into<String>,
        credential_provider_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            license_dir: license_dir.into(),
            callback_endpoint: callback_endpoint.into(),
            credential_provider_endpoint: credential_provider_endpoint.into(),
            secret_prefix: DEFAULT_SECRET_PREFIX.to_string(),
        }
    }

    /// Sets the secret name prefix.
    pub fn with_secret_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secret_prefix = prefix.into();
        self
    }

    /// Callback URL for the job running under `lock_id`.
    pub fn callback_url(&self, lock_id: &str) -> String {
        format!(
            "{}/{}",
            self.callback_endpoint.trim_end_matches('/'),
            urlencoding::encode(lock_id)
        )
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            lock_dir: config.storage.lock_dir.clone(),
            license_dir: config.storage.license_dir.clone(),
            callback_endpoint: config.update.callback_endpoint.clone(),
            credential_provider_endpoint: config.update.credential_provider_endpoint.clone(),
            secret_prefix: config.update.secret_prefix.clone(),
        }
    }
}
