pub mod config;
pub mod credential;
pub mod error;
pub mod job;
pub mod license;
pub mod lock;
pub mod manifest;
pub mod metrics;
pub mod orchestrator;
pub mod record;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LicenseServerConfig,
    SanitizedConfig, ServerConfig, StorageConfig, StsConfig, UpdateConfig,
};
pub use credential::{CredentialError, HttpTokenProvider, TokenProvider};
pub use error::ErrorKind;
pub use job::{
    JobConfig, JobDescriptor, JobError, JobLauncher, JobLauncherFactory, KubectlJobLauncher,
    KubectlLauncherFactory,
};
pub use license::{
    HttpLicenseFetcher, License, LicenseError, LicenseFetchError, LicenseFetcher, LicenseStore,
    SetOption, SoftwareComponent,
};
pub use lock::{JobMessage, Lock, LockError, LockState, MessageKind};
pub use manifest::{CredentialTarget, InstallRecord, ManifestDiffer, RepoRecord, UpdateManifest};
pub use orchestrator::{
    LaunchOutcome, OrchestratorConfig, UpdateError, UpdateOrchestrator, UpdateStatus,
};
pub use record::{JsonRecord, RecordError, Validate, WriteMode};
