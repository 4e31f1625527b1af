//! Update job launching.
//!
//! The orchestrator only depends on [`JobLauncher`] / [`JobLauncherFactory`].
//! [`KubectlJobLauncher`] runs the update agent as a Kubernetes Job.

mod config;
mod error;
mod kubectl;
mod traits;
mod types;

pub use config::JobConfig;
pub use error::JobError;
pub use kubectl::{KubectlJobLauncher, KubectlLauncherFactory, JOB_ID_LABEL};
pub use traits::{JobLauncher, JobLauncherFactory};
pub use types::JobDescriptor;
