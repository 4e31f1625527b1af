//! Update orchestrator implementation.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::credential::TokenProvider;
use crate::job::{JobDescriptor, JobLauncherFactory};
use crate::license::{License, LicenseStore};
use crate::lock::{JobMessage, Lock, LockError, LockState, MessageKind};
use crate::manifest::ManifestDiffer;
use crate::metrics;
use crate::record::Validate;

use super::config::OrchestratorConfig;
use super::types::{LaunchOutcome, UpdateError, UpdateStatus};

/// Coordinates the lifecycle of a single software update.
///
/// Holds the one active [`Lock`] handle. `launch_update`, `notify`, `status`
/// and `installed_license` all acquire the same FIFO mutex and hold it until
/// they finish, which makes every change to the lock and license files
/// linearizable within this process. Across processes the exclusive create
/// of the lock file is the only guard.
///
/// `launch_update` and `notify` run on a spawned task. Dropping the returned
/// future (a disconnected HTTP client, a timeout) only stops waiting for the
/// result; the operation itself always runs to completion.
#[derive(Clone)]
pub struct UpdateOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    config: OrchestratorConfig,
    differ: ManifestDiffer,
    token_provider: Arc<dyn TokenProvider>,
    launcher_factory: Arc<dyn JobLauncherFactory>,
    active: Mutex<Option<Lock>>,
}

impl UpdateOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        token_provider: Arc<dyn TokenProvider>,
        launcher_factory: Arc<dyn JobLauncherFactory>,
    ) -> Self {
        let differ = ManifestDiffer::new(config.secret_prefix.clone());
        Self {
            shared: Arc::new(Shared {
                config,
                differ,
                token_provider,
                launcher_factory,
                active: Mutex::new(None),
            }),
        }
    }

    /// Starts an update towards `license`.
    ///
    /// On any failure after the lock file was created the file is archived
    /// again before the original error is returned, so a failed launch never
    /// leaves an `ACTIVE` lock behind.
    pub async fn launch_update(&self, license: License) -> Result<LaunchOutcome, UpdateError> {
        let shared = Arc::clone(&self.shared);
        run_to_completion(async move { shared.launch_update(license).await }).await
    }

    /// Applies messages reported by the update job for lock `lock_id`.
    ///
    /// Recovers the lock from disk when this process holds no handle (e.g.
    /// after a restart). Once the lock leaves `ACTIVE`, the job and the lock
    /// file are cleaned up on a best-effort basis; cleanup failures are logged
    /// and never replace the error of the notification itself.
    pub async fn notify(&self, lock_id: &str, messages: &[JobMessage]) -> Result<(), UpdateError> {
        check_messages(lock_id, messages)?;

        let shared = Arc::clone(&self.shared);
        let lock_id = lock_id.to_string();
        let messages = messages.to_vec();
        run_to_completion(async move { shared.notify(&lock_id, &messages).await }).await
    }

    /// The update recorded in the lock file, if any.
    ///
    /// Reads the lock file when no handle is held. A lock left behind in a
    /// terminal state is reported with `stale` set; it is retired by the
    /// next notification.
    pub async fn status(&self) -> Result<Option<UpdateStatus>, UpdateError> {
        self.shared.status().await
    }

    /// The license currently recorded as installed.
    pub async fn installed_license(&self) -> Result<License, UpdateError> {
        self.shared.installed_license().await
    }
}

/// Runs `task` on its own tokio task and waits for its result.
async fn run_to_completion<T, F>(task: F) -> Result<T, UpdateError>
where
    F: Future<Output = Result<T, UpdateError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            error!(error = %e, "Update task did not complete");
            Err(UpdateError::Interrupted(e.to_string()))
        }
    }
}

impl Shared {
    async fn launch_update(&self, license: License) -> Result<LaunchOutcome, UpdateError> {
        let mut active = self.active.lock().await;

        if let Some(lock) = active.as_ref() {
            let lock_id = lock.lock_id().map(str::to_string).unwrap_or_default();
            warn!(lock_id = %lock_id, "Cannot create lock, a lock already exists");
            metrics::UPDATE_LAUNCHES.with_label_values(&["conflict"]).inc();
            return Err(UpdateError::Conflict { lock_id });
        }

        license.validate().map_err(|reason| {
            metrics::UPDATE_LAUNCHES.with_label_values(&["invalid"]).inc();
            UpdateError::InvalidArgument(format!("invalid license: {reason}"))
        })?;

        trace!(lock_dir = %self.config.lock_dir.display(), "Creating lock on file system");
        let mut lock = Lock::new(&self.config.lock_dir);
        if let Err(e) = lock.create(&license).await {
            error!(error = %e, "Error creating lock");
            let result = if e.kind().is_client_error() {
                "conflict"
            } else {
                "failed"
            };
            metrics::UPDATE_LAUNCHES.with_label_values(&[result]).inc();
            return Err(e.into());
        }

        match self.start_update(&mut lock, &license).await {
            Ok(outcome) => {
                info!(lock_id = %outcome.lock_id, components = license.components.len(), "Update job launched");
                metrics::UPDATE_LAUNCHES.with_label_values(&["started"]).inc();
                *active = Some(lock);
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Update launch failed, cleaning up lock");
                if let Err(cleanup_err) = lock.cleanup().await {
                    error!(error = %cleanup_err, "Error cleaning up lock after failed launch");
                    metrics::CLEANUP_FAILURES.with_label_values(&["lock"]).inc();
                }
                metrics::UPDATE_LAUNCHES.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    async fn start_update(
        &self,
        lock: &mut Lock,
        license: &License,
    ) -> Result<LaunchOutcome, UpdateError> {
        lock.init().await?;
        let lock_id = lock.lock_id()?.to_string();

        let mut installed = self.license_store();
        installed.load().await?;

        let token = self.token_provider.fetch_token().await.map_err(|e| {
            error!(error = %e, "Error fetching software update token");
            UpdateError::from(e)
        })?;

        let manifest = installed.generate_update_manifest(license)?;
        debug!(
            lock_id = %lock_id,
            installs = manifest.install_records.len(),
            uninstalls = manifest.uninstall_records.len(),
            repos = manifest.private_container_repos.len(),
            "Generated update manifest"
        );
        if manifest.is_noop() {
            info!(lock_id = %lock_id, "License unchanged, update job only refreshes registry credentials");
        }

        let descriptor = JobDescriptor {
            callback_endpoint: self.config.callback_url(&lock_id),
            credential_provider_endpoint: self.config.credential_provider_endpoint.clone(),
            credential_provider_auth_token: token,
            manifest,
        };

        let launcher = self.launcher_factory.create(&lock_id);
        if let Err(e) = launcher.start(&descriptor).await {
            error!(lock_id = %lock_id, error = %e, "Error starting update job");
            // A partial start may have left resources behind.
            if let Err(cleanup_err) = launcher.cleanup().await {
                error!(lock_id = %lock_id, error = %cleanup_err, "Error cleaning up update job");
                metrics::CLEANUP_FAILURES.with_label_values(&["job"]).inc();
            }
            return Err(UpdateError::Launch(e));
        }

        Ok(LaunchOutcome {
            lock_id,
            state: lock.state()?,
        })
    }

    async fn notify(&self, lock_id: &str, messages: &[JobMessage]) -> Result<(), UpdateError> {
        let mut active = self.active.lock().await;
        let lock = active.get_or_insert_with(|| {
            warn!(lock_dir = %self.config.lock_dir.display(), "No lock reference, recovering lock from disk");
            Lock::new(&self.config.lock_dir)
        });

        let result = self.apply_messages(lock, lock_id, messages).await;
        if let Err(e) = &result {
            warn!(lock_id = %lock_id, error = %e, "Error processing job messages");
        }

        if !lock.is_ready() {
            *active = None;
        } else if lock.state().map(|s| s.is_terminal()).unwrap_or(false) {
            self.finish(lock).await;
            *active = None;
        } else {
            trace!("Lock still active, no clean up required");
        }

        result
    }

    async fn apply_messages(
        &self,
        lock: &mut Lock,
        lock_id: &str,
        messages: &[JobMessage],
    ) -> Result<(), UpdateError> {
        lock.init().await?;

        let state = lock.state()?;
        if state != LockState::Active {
            return Err(UpdateError::InvalidState { state });
        }

        let current = lock.lock_id()?;
        if current != lock_id {
            warn!(current_lock_id = %current, message_lock_id = %lock_id, "Messages do not apply to current lock");
            return Err(UpdateError::LockMismatch {
                current: current.to_string(),
                requested: lock_id.to_string(),
            });
        }

        for message in messages {
            lock.add_log(message)?;
            match message.kind {
                MessageKind::Success => lock.update_state(LockState::Done)?,
                MessageKind::Fail => lock.update_state(LockState::Error)?,
                MessageKind::Log => {}
            }
            metrics::NOTIFY_MESSAGES
                .with_label_values(&[message.kind.as_str()])
                .inc();
        }
        lock.save().await?;

        if lock.state()? == LockState::Done {
            let mut installed = self.license_store();
            installed.set_data(lock.license()?.clone())?;
            installed.save().await?;
            info!(lock_id = %lock_id, "Update complete, installed license updated");
        }

        Ok(())
    }

    /// Best-effort cleanup of the job and the lock file.
    async fn finish(&self, lock: &mut Lock) {
        let (lock_id, state) = match (lock.lock_id(), lock.state()) {
            (Ok(id), Ok(state)) => (id.to_string(), state),
            _ => return,
        };
        debug!(lock_id = %lock_id, state = %state, "Cleaning up finished update");

        let launcher = self.launcher_factory.create(&lock_id);
        let (job_result, lock_result) = futures::join!(launcher.cleanup(), lock.cleanup());

        if let Err(e) = job_result {
            error!(lock_id = %lock_id, error = %e, "Error cleaning up job");
            metrics::CLEANUP_FAILURES.with_label_values(&["job"]).inc();
        }
        if let Err(e) = lock_result {
            error!(lock_id = %lock_id, error = %e, "Error cleaning up lock");
            metrics::CLEANUP_FAILURES.with_label_values(&["lock"]).inc();
        }
        metrics::UPDATES_FINISHED
            .with_label_values(&[state.as_str()])
            .inc();
    }

    async fn status(&self) -> Result<Option<UpdateStatus>, UpdateError> {
        let active = self.active.lock().await;
        if let Some(lock) = active.as_ref() {
            return Ok(Some(snapshot(lock)?));
        }

        let mut lock = Lock::new(&self.config.lock_dir);
        match lock.init().await {
            Ok(()) => Ok(Some(snapshot(&lock)?)),
            Err(LockError::Missing { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn installed_license(&self) -> Result<License, UpdateError> {
        let _active = self.active.lock().await;
        let mut installed = self.license_store();
        installed.load().await?;
        Ok(installed.data().clone())
    }

    fn license_store(&self) -> LicenseStore {
        LicenseStore::new(&self.config.license_dir, self.differ.clone())
    }
}

fn snapshot(lock: &Lock) -> Result<UpdateStatus, LockError> {
    let state = lock.state()?;
    Ok(UpdateStatus {
        lock_id: lock.lock_id()?.to_string(),
        stale: state.is_terminal(),
        state,
        log_count: lock.logs()?.len(),
        components: lock.license()?.components.len(),
    })
}

fn check_messages(lock_id: &str, messages: &[JobMessage]) -> Result<(), UpdateError> {
    if lock_id.is_empty() {
        return Err(UpdateError::InvalidArgument(
            "lockId must not be empty".to_string(),
        ));
    }
    if messages.is_empty() {
        return Err(UpdateError::InvalidArgument(
            "messages must not be empty".to_string(),
        ));
    }
    for (idx, message) in messages.iter().enumerate() {
        message
            .check()
            .map_err(|reason| UpdateError::InvalidArgument(format!("messages[{idx}]: {reason}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::job::JobError;
    use crate::lock::LOCK_FILE_NAME;
    use crate::testing::fixtures;
    use crate::testing::{MockJobLauncherFactory, MockTokenProvider};
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        tokens: Arc<MockTokenProvider>,
        jobs: Arc<MockJobLauncherFactory>,
        orchestrator: UpdateOrchestrator,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let tokens = Arc::new(MockTokenProvider::new("sts-token"));
            let jobs = Arc::new(MockJobLauncherFactory::new());
            let orchestrator = build(&dir, tokens.clone(), jobs.clone());
            Self {
                dir,
                tokens,
                jobs,
                orchestrator,
            }
        }

        fn lock_file(&self) -> std::path::PathBuf {
            self.dir.path().join("lock").join(LOCK_FILE_NAME)
        }
    }

    fn build(
        dir: &TempDir,
        tokens: Arc<MockTokenProvider>,
        jobs: Arc<MockJobLauncherFactory>,
    ) -> UpdateOrchestrator {
        let lock_dir = dir.path().join("lock");
        let license_dir = dir.path().join("license");
        std::fs::create_dir_all(&lock_dir).unwrap();
        std::fs::create_dir_all(&license_dir).unwrap();
        UpdateOrchestrator::new(
            OrchestratorConfig::new(
                lock_dir,
                license_dir,
                "http://updater/api/v1/license/notify",
                "https://creds.example.com",
            ),
            tokens,
            jobs,
        )
    }

    fn success(message: &str) -> JobMessage {
        JobMessage::new(MessageKind::Success, 1000.0, message)
    }

    fn fail(message: &str) -> JobMessage {
        JobMessage::new(MessageKind::Fail, 1000.0, message)
    }

    fn log(message: &str) -> JobMessage {
        JobMessage::new(MessageKind::Log, 1000.0, message)
    }

    #[tokio::test]
    async fn test_launch_starts_job_with_descriptor() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        assert_eq!(outcome.state, LockState::Active);
        assert!(h.lock_file().exists());

        let starts = h.jobs.recorded_starts().await;
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].job_id, outcome.lock_id);
        let descriptor = &starts[0].descriptor;
        assert_eq!(
            descriptor.callback_endpoint,
            format!("http://updater/api/v1/license/notify/{}", outcome.lock_id)
        );
        assert_eq!(descriptor.credential_provider_endpoint, "https://creds.example.com");
        assert_eq!(descriptor.credential_provider_auth_token, "sts-token");
        assert_eq!(descriptor.manifest.install_records.len(), 1);
        assert!(descriptor.manifest.uninstall_records.is_empty());
    }

    #[tokio::test]
    async fn test_second_launch_conflicts() {
        let h = Harness::new();
        let first = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        let err = h
            .orchestrator
            .launch_update(fixtures::license(&["db"]))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Conflict { ref lock_id } if *lock_id == first.lock_id));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(h.jobs.start_count().await, 1);
    }

    #[tokio::test]
    async fn test_launch_rejects_invalid_license() {
        let h = Harness::new();
        let mut license = fixtures::license(&["web", "web"]);
        license.components[0].chart_name.clear();

        let err = h.orchestrator.launch_update(license).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!h.lock_file().exists());
        assert_eq!(h.jobs.start_count().await, 0);
    }

    #[tokio::test]
    async fn test_launch_fails_when_lock_file_exists() {
        let h = Harness::new();
        std::fs::write(h.lock_file(), "{}").unwrap();

        let err = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Lock(LockError::Exists { .. })));
        // Someone else's lock file is left alone.
        assert_eq!(std::fs::read_to_string(h.lock_file()).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_token_failure_cleans_up_lock() {
        let h = Harness::new();
        h.tokens
            .set_next_error(crate::credential::CredentialError::EmptyToken)
            .await;

        let err = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Credential);
        assert!(!h.lock_file().exists());
        assert_eq!(h.jobs.start_count().await, 0);

        // The slot is free again.
        h.orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_job_start_failure_cleans_up_lock_and_job() {
        let h = Harness::new();
        h.jobs
            .set_next_start_error(JobError::invalid_descriptor("boom"))
            .await;

        let err = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Launch);
        assert!(!h.lock_file().exists());
        assert_eq!(h.jobs.cleanup_count().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_installed_license_cleans_up_lock() {
        let h = Harness::new();
        std::fs::write(h.dir.path().join("license").join("_license"), "nope").unwrap();

        let err = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(!h.lock_file().exists());
    }

    #[tokio::test]
    async fn test_notify_success_installs_license_and_cleans_up() {
        let h = Harness::new();
        let license = fixtures::license(&["web", "db"]);
        let outcome = h.orchestrator.launch_update(license.clone()).await.unwrap();

        h.orchestrator
            .notify(&outcome.lock_id, &[log("installing"), success("done")])
            .await
            .unwrap();

        assert!(!h.lock_file().exists());
        assert!(h.dir.path().join("lock").join(&outcome.lock_id).exists());
        assert_eq!(h.orchestrator.installed_license().await.unwrap(), license);
        assert_eq!(h.jobs.cleaned_up_jobs().await, vec![outcome.lock_id.clone()]);
        assert!(h.orchestrator.status().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notify_log_keeps_lock_active() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        h.orchestrator
            .notify(&outcome.lock_id, &[log("step 1"), log("step 2")])
            .await
            .unwrap();

        let status = h.orchestrator.status().await.unwrap().unwrap();
        assert_eq!(status.state, LockState::Active);
        assert_eq!(status.log_count, 3);
        assert!(h.lock_file().exists());
        assert_eq!(h.jobs.cleanup_count().await, 0);
    }

    #[tokio::test]
    async fn test_notify_fail_keeps_installed_license() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        h.orchestrator
            .notify(&outcome.lock_id, &[fail("helm install failed")])
            .await
            .unwrap();

        assert!(!h.lock_file().exists());
        assert!(h.orchestrator.installed_license().await.unwrap().is_empty());
        assert_eq!(h.jobs.cleanup_count().await, 1);
    }

    #[tokio::test]
    async fn test_notify_last_message_wins() {
        let h = Harness::new();
        let license = fixtures::license(&["web"]);
        let outcome = h.orchestrator.launch_update(license.clone()).await.unwrap();

        h.orchestrator
            .notify(&outcome.lock_id, &[fail("retrying"), success("done")])
            .await
            .unwrap();

        assert_eq!(h.orchestrator.installed_license().await.unwrap(), license);
    }

    #[tokio::test]
    async fn test_notify_foreign_lock_is_rejected() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        let err = h
            .orchestrator
            .notify("someone-else", &[success("done")])
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::LockMismatch { .. }));

        let status = h.orchestrator.status().await.unwrap().unwrap();
        assert_eq!(status.lock_id, outcome.lock_id);
        assert_eq!(status.state, LockState::Active);
        assert_eq!(status.log_count, 1);
        assert!(h.lock_file().exists());
    }

    #[tokio::test]
    async fn test_notify_validates_messages() {
        let h = Harness::new();

        let err = h.orchestrator.notify("abc", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = h
            .orchestrator
            .notify("abc", &[JobMessage::new(MessageKind::Log, -5.0, "x")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = h.orchestrator.notify("", &[log("x")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_notify_without_lock_file() {
        let h = Harness::new();
        let err = h
            .orchestrator
            .notify("abc", &[log("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Lock(LockError::Missing { .. })));

        // The failed recovery does not block a launch.
        h.orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notify_recovers_after_restart() {
        let h = Harness::new();
        let license = fixtures::license(&["web"]);
        let outcome = h.orchestrator.launch_update(license.clone()).await.unwrap();

        let restarted = build(&h.dir, h.tokens.clone(), h.jobs.clone());
        restarted
            .notify(&outcome.lock_id, &[success("done")])
            .await
            .unwrap();

        assert!(!h.lock_file().exists());
        assert_eq!(restarted.installed_license().await.unwrap(), license);
    }

    #[tokio::test]
    async fn test_notify_cleans_up_stale_finished_lock() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        // Simulate a crash between saving a terminal state and cleanup.
        let mut lock = Lock::new(h.dir.path().join("lock"));
        lock.init().await.unwrap();
        lock.update_state(LockState::Error).unwrap();
        lock.save().await.unwrap();

        let restarted = build(&h.dir, h.tokens.clone(), h.jobs.clone());
        let err = restarted
            .notify(&outcome.lock_id, &[log("late")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::InvalidState {
                state: LockState::Error
            }
        ));
        assert!(!h.lock_file().exists());
        assert_eq!(h.jobs.cleanup_count().await, 1);
    }

    #[tokio::test]
    async fn test_job_cleanup_failure_is_swallowed() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();
        h.jobs
            .set_next_cleanup_error(JobError::command_failed("delete", "exit 1", None))
            .await;

        h.orchestrator
            .notify(&outcome.lock_id, &[success("done")])
            .await
            .unwrap();
        assert!(!h.lock_file().exists());
    }

    #[tokio::test]
    async fn test_concurrent_launches_are_serialized() {
        let h = Harness::new();
        h.jobs
            .set_start_delay(std::time::Duration::from_millis(50))
            .await;

        let (a, b) = tokio::join!(
            h.orchestrator.launch_update(fixtures::license(&["web"])),
            h.orchestrator.launch_update(fixtures::license(&["db"])),
        );
        assert!(a.is_ok() ^ b.is_ok());
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, UpdateError::Conflict { .. }));
        assert_eq!(h.jobs.start_count().await, 1);
    }

    #[tokio::test]
    async fn test_status_reads_lock_file_without_handle() {
        let h = Harness::new();
        assert!(h.orchestrator.status().await.unwrap().is_none());

        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web", "db"]))
            .await
            .unwrap();

        let restarted = build(&h.dir, h.tokens.clone(), h.jobs.clone());
        let status = restarted.status().await.unwrap().unwrap();
        assert_eq!(status.lock_id, outcome.lock_id);
        assert_eq!(status.components, 2);
    }

    #[tokio::test]
    async fn test_dropped_launch_runs_to_completion() {
        let h = Harness::new();
        h.jobs
            .set_start_delay(std::time::Duration::from_millis(300))
            .await;

        let dropped = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            h.orchestrator.launch_update(fixtures::license(&["web"])),
        )
        .await;
        assert!(dropped.is_err());

        // Waits for the detached launch, which still owns the lock.
        let status = h.orchestrator.status().await.unwrap().unwrap();
        assert_eq!(status.state, LockState::Active);
        assert!(!status.stale);
        assert_eq!(h.jobs.start_count().await, 1);

        h.orchestrator
            .notify(&status.lock_id, &[success("done")])
            .await
            .unwrap();
        assert!(!h.lock_file().exists());
        assert!(h
            .orchestrator
            .launch_update(fixtures::license(&["db"]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_dropped_failing_launch_still_cleans_up_lock() {
        let h = Harness::new();
        h.jobs
            .set_start_delay(std::time::Duration::from_millis(300))
            .await;
        h.jobs
            .set_next_start_error(JobError::command_failed("apply", "exit 1", None))
            .await;

        let dropped = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            h.orchestrator.launch_update(fixtures::license(&["web"])),
        )
        .await;
        assert!(dropped.is_err());

        assert!(h.orchestrator.status().await.unwrap().is_none());
        assert!(!h.lock_file().exists());

        h.jobs.set_start_delay(std::time::Duration::ZERO).await;
        assert!(h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_notify_retires_lock_in_unknown_state() {
        let h = Harness::new();
        let outcome = h
            .orchestrator
            .launch_update(fixtures::license(&["web"]))
            .await
            .unwrap();

        let mut record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(h.lock_file()).unwrap()).unwrap();
        record["state"] = serde_json::json!("READY");
        std::fs::write(h.lock_file(), record.to_string()).unwrap();

        let restarted = build(&h.dir, h.tokens.clone(), h.jobs.clone());
        let status = restarted.status().await.unwrap().unwrap();
        assert!(status.stale);

        let err = restarted
            .notify(&outcome.lock_id, &[success("done")])
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            UpdateError::InvalidState { state: LockState::Other(state) } if state == "READY"
        ));
        assert!(!h.lock_file().exists());
        assert!(h.dir.path().join("lock").join(&outcome.lock_id).exists());
        assert_eq!(h.jobs.cleanup_count().await, 1);
    }

    #[tokio::test]
    async fn test_lock_cleanup_failure_is_swallowed() {
        let h = Harness::new();
        let license = fixtures::license(&["web"]);
        let outcome = h.orchestrator.launch_update(license.clone()).await.unwrap();

        // A non-empty directory where the lock would be archived makes the rename fail.
        let archive = h.dir.path().join("lock").join(&outcome.lock_id);
        std::fs::create_dir_all(&archive).unwrap();
        std::fs::write(archive.join("occupied"), "x").unwrap();

        h.orchestrator
            .notify(&outcome.lock_id, &[success("done")])
            .await
            .unwrap();

        assert_eq!(h.orchestrator.installed_license().await.unwrap(), license);
        assert_eq!(h.jobs.cleanup_count().await, 1);

        // The handle is released; the leftover file shows up as stale.
        assert!(h.lock_file().exists());
        let status = h.orchestrator.status().await.unwrap().unwrap();
        assert_eq!(status.lock_id, outcome.lock_id);
        assert_eq!(status.state, LockState::Done);
        assert!(status.stale);
    }
}
