//! Mock token provider for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::credential::{CredentialError, TokenProvider};

/// Mock implementation of [`TokenProvider`].
///
/// Hands out a fixed token and counts requests. A configured error is
/// returned once, then the token again.
#[derive(Debug, Clone)]
pub struct MockTokenProvider {
    token: Arc<RwLock<String>>,
    next_error: Arc<RwLock<Option<CredentialError>>>,
    requests: Arc<RwLock<usize>>,
}

impl MockTokenProvider {
    /// Create a provider returning `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.into())),
            next_error: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(0)),
        }
    }

    /// Change the token returned by later requests.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = token.into();
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: CredentialError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of token requests made.
    pub async fn request_count(&self) -> usize {
        *self.requests.read().await
    }
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new("mock-token")
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn fetch_token(&self) -> Result<String, CredentialError> {
        *self.requests.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.token.read().await.clone())
    }
}
