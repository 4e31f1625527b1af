//! kubectl-based job launcher.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, trace};

use super::config::JobConfig;
use super::error::JobError;
use super::traits::{JobLauncher, JobLauncherFactory};
use super::types::JobDescriptor;

/// Label put on every resource created for a job.
pub const JOB_ID_LABEL: &str = "update-job-id";

const MANIFEST_MOUNT: &str = "/etc/pca/manifest";
const MANIFEST_KEY: &str = "manifest";

/// Runs the update agent as a Kubernetes Job by piping resources to `kubectl apply`.
pub struct KubectlJobLauncher {
    job_id: String,
    config: JobConfig,
}

impl KubectlJobLauncher {
    pub fn new(job_id: impl Into<String>, config: JobConfig) -> Self {
        Self {
            job_id: job_id.into(),
            config,
        }
    }

    /// Name shared by the job and its config map.
    pub fn resource_name(&self) -> String {
        format!("update-agent-{}", self.job_id)
    }

    fn labels(&self) -> Value {
        json!({ JOB_ID_LABEL: self.job_id })
    }

    /// Renders the config map that carries the update manifest.
    pub fn render_config_map(&self, descriptor: &JobDescriptor) -> Result<Value, JobError> {
        let manifest = serde_json::to_string(&descriptor.manifest).map_err(|e| JobError::Render {
            resource: "ConfigMap".to_string(),
            reason: e.to_string(),
        })?;

        Ok(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": self.resource_name(),
                "labels": self.labels(),
            },
            "data": { MANIFEST_KEY: manifest },
        }))
    }

    /// Renders the batch job running the update agent.
    pub fn render_job(&self, descriptor: &JobDescriptor) -> Value {
        let name = self.resource_name();
        let manifest_file = format!("{MANIFEST_MOUNT}/{MANIFEST_KEY}");
        let env = [
            (
                "pcaUpdateAgent_production__callbackEndpoint",
                descriptor.callback_endpoint.as_str(),
            ),
            (
                "pcaUpdateAgent_production__credentialProviderEndpoint",
                descriptor.credential_provider_endpoint.as_str(),
            ),
            (
                "pcaUpdateAgent_production__credentialProviderAuth",
                descriptor.credential_provider_auth_token.as_str(),
            ),
            (
                "pcaUpdateAgent_production__manifestFile",
                manifest_file.as_str(),
            ),
            ("LOG_LEVEL", self.config.log_level.as_str()),
        ]
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect::<Vec<_>>();

        json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": name,
                "labels": self.labels(),
            },
            "spec": {
                "backoffLimit": self.config.backoff_limit,
                "activeDeadlineSeconds": self.config.active_deadline_secs,
                "template": {
                    "metadata": { "labels": self.labels() },
                    "spec": {
                        "serviceAccountName": self.config.service_account,
                        "restartPolicy": "Never",
                        "containers": [{
                            "name": "update-agent",
                            "image": self.config.agent_image,
                            "env": env,
                            "volumeMounts": [
                                { "name": "agent-manifest", "mountPath": MANIFEST_MOUNT },
                                { "name": "helm-ca-tls", "mountPath": "/root/.helm/ca.pem", "subPath": "ca.pem" },
                                { "name": "helm-tls", "mountPath": "/root/.helm/cert.pem", "subPath": "cert.pem" },
                                { "name": "helm-tls", "mountPath": "/root/.helm/key.pem", "subPath": "key.pem" },
                            ],
                        }],
                        "volumes": [
                            { "name": "agent-manifest", "configMap": { "name": name } },
                            {
                                "name": "helm-ca-tls",
                                "secret": {
                                    "secretName": self.config.helm_ca_secret,
                                    "items": [{ "key": "tls.crt", "path": "ca.pem" }],
                                },
                            },
                            {
                                "name": "helm-tls",
                                "secret": {
                                    "secretName": self.config.helm_cert_secret,
                                    "items": [
                                        { "key": "tls.crt", "path": "cert.pem" },
                                        { "key": "tls.key", "path": "key.pem" },
                                    ],
                                },
                            },
                        ],
                    },
                },
            },
        })
    }

    async fn apply(&self, action: &str, document: &Value) -> Result<(), JobError> {
        trace!(job_id = %self.job_id, document = %document, "{}", action);
        let input = document.to_string();
        self.run_kubectl(
            action,
            &["apply", "--namespace", &self.config.namespace, "-f", "-"],
            Some(input),
        )
        .await
    }

    async fn run_kubectl(
        &self,
        action: &str,
        args: &[&str],
        input: Option<String>,
    ) -> Result<(), JobError> {
        let mut child = Command::new(&self.config.kubectl_path)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    JobError::KubectlNotFound {
                        path: self.config.kubectl_path.clone(),
                    }
                } else {
                    JobError::Io(e)
                }
            })?;

        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                // Closing stdin lets kubectl see EOF.
                drop(stdin);
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(job_id = %self.job_id, status = %output.status, stderr = %stderr, "{} failed", action);
            return Err(JobError::command_failed(
                action,
                format!("kubectl exited with {}", output.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl JobLauncher for KubectlJobLauncher {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn start(&self, descriptor: &JobDescriptor) -> Result<(), JobError> {
        descriptor.validate()?;
        debug!(job_id = %self.job_id, namespace = %self.config.namespace, "Starting update job");

        let config_map = self.render_config_map(descriptor)?;
        self.apply("Creating ConfigMap for update job", &config_map)
            .await?;

        let job = self.render_job(descriptor);
        self.apply("Creating update job", &job).await?;

        debug!(job_id = %self.job_id, "Update job started");
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), JobError> {
        debug!(job_id = %self.job_id, "Cleaning up update job");
        let selector = format!("{JOB_ID_LABEL}={}", self.job_id);
        self.run_kubectl(
            "Deleting update job resources",
            &[
                "delete",
                "job,configmap",
                "--namespace",
                &self.config.namespace,
                "-l",
                &selector,
                "--ignore-not-found",
            ],
            None,
        )
        .await
    }
}

/// Creates [`KubectlJobLauncher`]s sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct KubectlLauncherFactory {
    config: JobConfig,
}

impl KubectlLauncherFactory {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }
}

impl JobLauncherFactory for KubectlLauncherFactory {
    fn create(&self, job_id: &str) -> Box<dyn JobLauncher> {
        Box::new(KubectlJobLauncher::new(job_id, self.config.clone()))
    }
}
