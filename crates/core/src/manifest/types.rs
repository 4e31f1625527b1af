//! Update manifest types handed to the update job.

use serde::{Deserialize, Serialize};

use crate::license::SetOption;

/// A component the job has to install (or re-apply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    pub release_name: String,
    pub chart_name: String,
    pub namespace: String,
    pub set_options: Vec<SetOption>,
}

/// A service account that needs pull credentials for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTarget {
    pub service_account: String,
    pub namespace: String,
    /// Name of the secret holding the credentials, derived from account and namespace.
    pub secret_name: String,
}

/// A private container repository and everything that pulls from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRecord {
    pub repo_uri: String,
    pub targets: Vec<CredentialTarget>,
}

/// The actions required to move a server from one license to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManifest {
    pub private_container_repos: Vec<RepoRecord>,
    pub install_records: Vec<InstallRecord>,
    pub uninstall_records: Vec<String>,
}

impl UpdateManifest {
    /// True when the manifest neither installs nor uninstalls anything.
    pub fn is_noop(&self) -> bool {
        self.install_records.is_empty() && self.uninstall_records.is_empty()
    }
}
