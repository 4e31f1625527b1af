//! Types shared by job launchers.

use serde::{Deserialize, Serialize};

use crate::manifest::UpdateManifest;

use super::error::JobError;

/// Everything the update agent needs to run one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Endpoint the agent reports progress to. Already keyed by lock id.
    pub callback_endpoint: String,
    /// Endpoint the agent exchanges its token at for registry credentials.
    pub credential_provider_endpoint: String,
    /// Short-lived token issued for this update.
    pub credential_provider_auth_token: String,
    pub manifest: UpdateManifest,
}

impl JobDescriptor {
    pub fn validate(&self) -> Result<(), JobError> {
        let fields = [
            ("callbackEndpoint", &self.callback_endpoint),
            ("credentialProviderEndpoint", &self.credential_provider_endpoint),
            ("credentialProviderAuthToken", &self.credential_provider_auth_token),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(JobError::invalid_descriptor(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}
