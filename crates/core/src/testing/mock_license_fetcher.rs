//! Mock license fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::license::{License, LicenseFetchError, LicenseFetcher};

/// Mock implementation of [`LicenseFetcher`] serving a configurable license.
#[derive(Debug, Clone, Default)]
pub struct MockLicenseFetcher {
    license: Arc<RwLock<License>>,
    next_error: Arc<RwLock<Option<LicenseFetchError>>>,
    requests: Arc<RwLock<usize>>,
}

impl MockLicenseFetcher {
    /// Create a fetcher serving `license`.
    pub fn new(license: License) -> Self {
        Self {
            license: Arc::new(RwLock::new(license)),
            ..Default::default()
        }
    }

    /// Replace the served license.
    pub async fn set_license(&self, license: License) {
        *self.license.write().await = license;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: LicenseFetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of fetches made.
    pub async fn request_count(&self) -> usize {
        *self.requests.read().await
    }
}

#[async_trait]
impl LicenseFetcher for MockLicenseFetcher {
    async fn fetch_license(&self) -> Result<License, LicenseFetchError> {
        *self.requests.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.license.read().await.clone())
    }
}
