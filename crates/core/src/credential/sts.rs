//! Token provider backed by the security token service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::StsConfig;

use super::provider::{CredentialError, TokenProvider};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Fetches update tokens with a GET against the configured STS endpoint.
pub struct HttpTokenProvider {
    client: Client,
    endpoint: String,
    server_api_key: String,
}

impl HttpTokenProvider {
    pub fn new(config: &StsConfig) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CredentialError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            server_api_key: config.server_api_key.clone(),
        })
    }

    fn parse_token(body: &str) -> Result<String, CredentialError> {
        let response: TokenResponse =
            serde_json::from_str(body).map_err(|e| CredentialError::Parse(e.to_string()))?;
        if response.token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        Ok(response.token)
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self) -> Result<String, CredentialError> {
        debug!(endpoint = %self.endpoint, "Fetching software update token from sts");

        let response = self
            .client
            .get(&self.endpoint)
            .header("content-type", "application/json")
            .header("authorization", &self.server_api_key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching software update token");
                CredentialError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(status, "Token service rejected the request");
            return Err(CredentialError::Status { status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::Request(e.to_string()))?;
        Self::parse_token(&body).map_err(|e| {
            error!(error = %e, "Error parsing software update token");
            e
        })
    }
}
