//! License data types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::Validate;

/// A `--set key=value` option passed to the chart on install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOption {
    pub key: String,
    pub value: String,
}

impl SetOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single installable software component.
///
/// `release_name` identifies the component within a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareComponent {
    /// Unique name of the installed release.
    pub release_name: String,
    /// Chart used to install the component.
    pub chart_name: String,
    /// Namespace the component is deployed into.
    pub namespace: String,
    /// Options applied when installing the chart.
    pub set_options: Vec<SetOption>,
    /// Private container repositories referenced by the chart.
    pub container_repos: Vec<String>,
    /// Service accounts that run the component's workloads.
    pub service_accounts: Vec<String>,
}

/// The desired (or currently installed) set of components for a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub components: Vec<SoftwareComponent>,
}

impl License {
    pub fn new(components: Vec<SoftwareComponent>) -> Self {
        Self { components }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn release_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.release_name.as_str())
    }
}

fn check_non_empty(value: &str, field: &str, index: usize) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("components[{}].{} must not be empty", index, field));
    }
    Ok(())
}

impl Validate for License {
    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();

        for (idx, component) in self.components.iter().enumerate() {
            check_non_empty(&component.release_name, "releaseName", idx)?;
            check_non_empty(&component.chart_name, "chartName", idx)?;
            check_non_empty(&component.namespace, "namespace", idx)?;

            for option in &component.set_options {
                check_non_empty(&option.key, "setOptions.key", idx)?;
                check_non_empty(&option.value, "setOptions.value", idx)?;
            }
            for repo in &component.container_repos {
                check_non_empty(repo, "containerRepos", idx)?;
            }
            for account in &component.service_accounts {
                check_non_empty(account, "serviceAccounts", idx)?;
            }

            if !seen.insert(component.release_name.as_str()) {
                return Err(format!(
                    "duplicate releaseName '{}' at components[{}]",
                    component.release_name, idx
                ));
            }
        }

        Ok(())
    }
}
