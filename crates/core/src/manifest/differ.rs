//! License diffing.

use std::collections::{HashMap, HashSet};

use crate::license::SoftwareComponent;

use super::types::{CredentialTarget, InstallRecord, RepoRecord, UpdateManifest};

/// Default prefix for repository credential secret names.
pub const DEFAULT_SECRET_PREFIX: &str = "pca-repocred";

/// Computes update manifests from an old and a new component list.
///
/// The differ is stateless apart from the secret-name prefix; the same inputs
/// always produce the same manifest.
#[derive(Debug, Clone)]
pub struct ManifestDiffer {
    secret_prefix: String,
}

impl Default for ManifestDiffer {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_PREFIX)
    }
}

impl ManifestDiffer {
    pub fn new(secret_prefix: impl Into<String>) -> Self {
        Self {
            secret_prefix: secret_prefix.into(),
        }
    }

    pub fn secret_prefix(&self) -> &str {
        &self.secret_prefix
    }

    /// Builds the manifest that moves a server from `old` to `new`.
    pub fn diff(&self, old: &[SoftwareComponent], new: &[SoftwareComponent]) -> UpdateManifest {
        UpdateManifest {
            private_container_repos: self.container_repos(new),
            install_records: install_records(new),
            uninstall_records: uninstall_records(old, new),
        }
    }

    /// Name of the secret that holds repo credentials for an account in a namespace.
    pub fn secret_name(&self, service_account: &str, namespace: &str) -> String {
        format!("{}-{}-{}", self.secret_prefix, service_account, namespace)
    }

    /// Groups (repo, service account, namespace) triples by repository.
    ///
    /// Repositories appear in first-seen order. Targets keep traversal order
    /// and are not deduplicated.
    pub fn container_repos(&self, components: &[SoftwareComponent]) -> Vec<RepoRecord> {
        let mut records: Vec<RepoRecord> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for component in components {
            for repo_uri in &component.container_repos {
                for service_account in &component.service_accounts {
                    let slot = *index.entry(repo_uri.as_str()).or_insert_with(|| {
                        records.push(RepoRecord {
                            repo_uri: repo_uri.clone(),
                            targets: Vec::new(),
                        });
                        records.len() - 1
                    });

                    records[slot].targets.push(CredentialTarget {
                        service_account: service_account.clone(),
                        namespace: component.namespace.clone(),
                        secret_name: self.secret_name(service_account, &component.namespace),
                    });
                }
            }
        }

        records
    }
}

/// Every component of the new list is (re)installed, in list order.
pub fn install_records(new: &[SoftwareComponent]) -> Vec<InstallRecord> {
    new.iter()
        .map(|c| InstallRecord {
            release_name: c.release_name.clone(),
            chart_name: c.chart_name.clone(),
            namespace: c.namespace.clone(),
            set_options: c.set_options.clone(),
        })
        .collect()
}

/// Releases present in `old` but missing from `new`, in `old` order.
pub fn uninstall_records(old: &[SoftwareComponent], new: &[SoftwareComponent]) -> Vec<String> {
    let keep: HashSet<&str> = new.iter().map(|c| c.release_name.as_str()).collect();
    old.iter()
        .filter(|c| !keep.contains(c.release_name.as_str()))
        .map(|c| c.release_name.clone())
        .collect()
}
