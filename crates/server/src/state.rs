use std::sync::Arc;
use updater_core::{Config, LicenseFetcher, SanitizedConfig, UpdateOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<UpdateOrchestrator>,
    license_fetcher: Arc<dyn LicenseFetcher>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<UpdateOrchestrator>,
        license_fetcher: Arc<dyn LicenseFetcher>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            license_fetcher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &UpdateOrchestrator {
        &self.orchestrator
    }

    pub fn license_fetcher(&self) -> &dyn LicenseFetcher {
        self.license_fetcher.as_ref()
    }
}
