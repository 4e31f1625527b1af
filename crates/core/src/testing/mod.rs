//! Testing utilities and mock implementations for integration tests.
//!
//! This module provides mock implementations of the collaborator traits the
//! orchestrator depends on, so the full update lifecycle can be exercised
//! without a token service, a license server or a Kubernetes cluster.
//!
//! # Example
//!
//! ```rust,ignore
//! use updater_core::testing::{fixtures, MockJobLauncherFactory, MockTokenProvider};
//!
//! let tokens = Arc::new(MockTokenProvider::new("token"));
//! let jobs = Arc::new(MockJobLauncherFactory::new());
//! let orchestrator = UpdateOrchestrator::new(config, tokens, jobs.clone());
//!
//! let outcome = orchestrator.launch_update(fixtures::license(&["web"])).await?;
//! ```

mod mock_job_launcher;
mod mock_license_fetcher;
mod mock_token_provider;

pub use mock_job_launcher::{MockJobLauncherFactory, RecordedStart};
pub use mock_license_fetcher::MockLicenseFetcher;
pub use mock_token_provider::MockTokenProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::license::{License, SetOption, SoftwareComponent};
    use crate::lock::{JobMessage, MessageKind};

    /// Create a component with reasonable defaults.
    pub fn component(release_name: &str) -> SoftwareComponent {
        SoftwareComponent {
            release_name: release_name.to_string(),
            chart_name: format!("charts/{}", release_name),
            namespace: "apps".to_string(),
            set_options: vec![SetOption::new("replicaCount", "1")],
            container_repos: vec![format!("registry.example.com/{}", release_name)],
            service_accounts: vec!["default".to_string()],
        }
    }

    /// Create a license with one default component per release name.
    pub fn license(release_names: &[&str]) -> License {
        License::new(release_names.iter().map(|name| component(name)).collect())
    }

    /// Create a job message stamped with the current time.
    pub fn message(kind: MessageKind, text: &str) -> JobMessage {
        JobMessage::new(kind, chrono::Utc::now().timestamp_millis() as f64, text)
    }
}
