//! Fetching the desired license from the license server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::LicenseServerConfig;
use crate::error::ErrorKind;

use super::types::License;

/// Errors that can occur while fetching a license.
#[derive(Debug, Error)]
pub enum LicenseFetchError {
    #[error("error fetching server license: {0}")]
    Request(String),

    #[error("license server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("error parsing server license: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl LicenseFetchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Load
    }
}

/// Source of the license a server is entitled to.
#[async_trait]
pub trait LicenseFetcher: Send + Sync {
    async fn fetch_license(&self) -> Result<License, LicenseFetchError>;
}

/// Fetches the license over HTTP using the server's API key.
pub struct HttpLicenseFetcher {
    client: Client,
    url: String,
    server_api_key: String,
}

impl HttpLicenseFetcher {
    pub fn new(config: &LicenseServerConfig) -> Result<Self, LicenseFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LicenseFetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: license_url(&config.endpoint, &config.server_id),
            server_api_key: config.server_api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Substitutes the `:serverId` placeholder in the configured endpoint.
pub fn license_url(endpoint: &str, server_id: &str) -> String {
    endpoint.replacen(":serverId", &urlencoding::encode(server_id), 1)
}

#[async_trait]
impl LicenseFetcher for HttpLicenseFetcher {
    async fn fetch_license(&self) -> Result<License, LicenseFetchError> {
        debug!(url = %self.url, "Fetching license from server");

        let response = self
            .client
            .get(&self.url)
            .header("content-type", "application/json")
            .header("authorization", &self.server_api_key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching server license");
                LicenseFetchError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LicenseFetchError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        response.json::<License>().await.map_err(|e| {
            error!(error = %e, "Error parsing server license");
            LicenseFetchError::Parse(e.to_string())
        })
    }
}
