use async_trait::async_trait;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while obtaining an update token.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Error fetching software update token: {0}")]
    Request(String),

    #[error("Token service returned HTTP {status}")]
    Status { status: u16 },

    #[error("Error parsing software update token: {0}")]
    Parse(String),

    #[error("Token service returned an empty token")]
    EmptyToken,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Credential
    }
}

/// Issues the short-lived token the update agent uses to fetch registry credentials.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<String, CredentialError>;
}
