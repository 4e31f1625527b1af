//! Mock job launcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::job::{JobDescriptor, JobError, JobLauncher, JobLauncherFactory};

/// A recorded job start for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedStart {
    /// Job id the launcher was created for.
    pub job_id: String,
    /// Descriptor passed to `start`.
    pub descriptor: JobDescriptor,
}

#[derive(Debug, Default)]
struct Shared {
    starts: RwLock<Vec<RecordedStart>>,
    cleanups: RwLock<Vec<String>>,
    next_start_error: RwLock<Option<JobError>>,
    next_cleanup_error: RwLock<Option<JobError>>,
    start_delay_ms: RwLock<u64>,
}

/// Mock implementation of [`JobLauncherFactory`].
///
/// Every launcher it creates records into the same shared state, so a test
/// can hand the factory to the orchestrator and inspect it afterwards:
/// - Track started jobs and their descriptors
/// - Track cleaned up job ids
/// - Simulate start/cleanup failures
/// - Simulate a slow start
///
/// # Example
///
/// ```rust,ignore
/// use updater_core::testing::MockJobLauncherFactory;
///
/// let jobs = Arc::new(MockJobLauncherFactory::new());
/// let orchestrator = UpdateOrchestrator::new(config, tokens, jobs.clone());
///
/// orchestrator.launch_update(license).await?;
/// assert_eq!(jobs.start_count().await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockJobLauncherFactory {
    shared: Arc<Shared>,
}

impl MockJobLauncherFactory {
    /// Create a new mock factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded starts.
    pub async fn recorded_starts(&self) -> Vec<RecordedStart> {
        self.shared.starts.read().await.clone()
    }

    /// Get the number of successful starts.
    pub async fn start_count(&self) -> usize {
        self.shared.starts.read().await.len()
    }

    /// Get the job ids cleanup was called for, in call order.
    pub async fn cleaned_up_jobs(&self) -> Vec<String> {
        self.shared.cleanups.read().await.clone()
    }

    /// Get the number of cleanup calls.
    pub async fn cleanup_count(&self) -> usize {
        self.shared.cleanups.read().await.len()
    }

    /// Configure the next start to fail with the given error.
    pub async fn set_next_start_error(&self, error: JobError) {
        *self.shared.next_start_error.write().await = Some(error);
    }

    /// Configure the next cleanup to fail with the given error.
    pub async fn set_next_cleanup_error(&self, error: JobError) {
        *self.shared.next_cleanup_error.write().await = Some(error);
    }

    /// Set how long `start` takes.
    pub async fn set_start_delay(&self, delay: Duration) {
        *self.shared.start_delay_ms.write().await = delay.as_millis() as u64;
    }
}

impl JobLauncherFactory for MockJobLauncherFactory {
    fn create(&self, job_id: &str) -> Box<dyn JobLauncher> {
        Box::new(MockJobLauncher {
            job_id: job_id.to_string(),
            shared: self.shared.clone(),
        })
    }
}

struct MockJobLauncher {
    job_id: String,
    shared: Arc<Shared>,
}

#[async_trait]
impl JobLauncher for MockJobLauncher {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn start(&self, descriptor: &JobDescriptor) -> Result<(), JobError> {
        let delay_ms = *self.shared.start_delay_ms.read().await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(error) = self.shared.next_start_error.write().await.take() {
            return Err(error);
        }

        self.shared.starts.write().await.push(RecordedStart {
            job_id: self.job_id.clone(),
            descriptor: descriptor.clone(),
        });
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), JobError> {
        self.shared.cleanups.write().await.push(self.job_id.clone());

        if let Some(error) = self.shared.next_cleanup_error.write().await.take() {
            return Err(error);
        }
        Ok(())
    }
}
