//! Configuration for the kubectl job launcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`KubectlJobLauncher`](super::KubectlJobLauncher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Path to the kubectl binary.
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: PathBuf,

    /// Namespace the agent job and its config map are created in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Container image of the update agent.
    #[serde(default = "default_agent_image")]
    pub agent_image: String,

    /// Service account the agent runs as.
    #[serde(default = "default_service_account")]
    pub service_account: String,

    #[serde(default = "default_backoff_limit")]
    pub backoff_limit: u32,

    #[serde(default = "default_active_deadline")]
    pub active_deadline_secs: u64,

    /// Secret holding the helm CA certificate (`tls.crt`).
    #[serde(default = "default_helm_ca_secret")]
    pub helm_ca_secret: String,

    /// Secret holding the helm client certificate and key (`tls.crt`, `tls.key`).
    #[serde(default = "default_helm_cert_secret")]
    pub helm_cert_secret: String,

    /// Log level passed to the agent.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kubectl_path() -> PathBuf {
    PathBuf::from("kubectl")
}

fn default_namespace() -> String {
    "kube-system".to_string()
}

fn default_agent_image() -> String {
    "vamship/pca-update-agent:2.0.1".to_string()
}

fn default_service_account() -> String {
    "pca-agent".to_string()
}

fn default_backoff_limit() -> u32 {
    4
}

fn default_active_deadline() -> u64 {
    300 // 5 minutes
}

fn default_helm_ca_secret() -> String {
    "pca-helm-ca-certificate".to_string()
}

fn default_helm_cert_secret() -> String {
    "pca-helm-certificate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            kubectl_path: default_kubectl_path(),
            namespace: default_namespace(),
            agent_image: default_agent_image(),
            service_account: default_service_account(),
            backoff_limit: default_backoff_limit(),
            active_deadline_secs: default_active_deadline(),
            helm_ca_secret: default_helm_ca_secret(),
            helm_cert_secret: default_helm_cert_secret(),
            log_level: default_log_level(),
        }
    }
}

impl JobConfig {
    /// Sets the kubectl binary path.
    pub fn with_kubectl_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubectl_path = path.into();
        self
    }

    /// Sets the target namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
