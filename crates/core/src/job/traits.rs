//! Trait definitions for the job module.

use async_trait::async_trait;

use super::error::JobError;
use super::types::JobDescriptor;

/// Starts and tears down the out-of-process update agent for one job.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Unique identifier this launcher was built for.
    fn job_id(&self) -> &str;

    /// Launches the agent described by `descriptor`.
    async fn start(&self, descriptor: &JobDescriptor) -> Result<(), JobError>;

    /// Removes every resource created for this job. Succeeds when nothing is left.
    async fn cleanup(&self) -> Result<(), JobError>;
}

/// Builds a [`JobLauncher`] for a given job id.
pub trait JobLauncherFactory: Send + Sync {
    fn create(&self, job_id: &str) -> Box<dyn JobLauncher>;
}
