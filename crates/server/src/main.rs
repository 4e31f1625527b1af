use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use updater_core::{
    load_config, validate_config, HttpLicenseFetcher, HttpTokenProvider, JobLauncherFactory,
    KubectlLauncherFactory, LicenseFetcher, OrchestratorConfig, TokenProvider, UpdateOrchestrator,
};
use updater_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("UPDATER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Lock directory: {:?}", config.storage.lock_dir);
    info!("License directory: {:?}", config.storage.license_dir);

    for dir in [&config.storage.lock_dir, &config.storage.license_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    // Collaborators
    let token_provider: Arc<dyn TokenProvider> = Arc::new(
        HttpTokenProvider::new(&config.sts).context("Failed to create token provider")?,
    );
    let license_fetcher: Arc<dyn LicenseFetcher> = Arc::new(
        HttpLicenseFetcher::new(&config.license_server)
            .context("Failed to create license fetcher")?,
    );
    info!(
        "Jobs run in namespace {} using {:?}",
        config.job.namespace, config.job.kubectl_path
    );
    let launcher_factory: Arc<dyn JobLauncherFactory> =
        Arc::new(KubectlLauncherFactory::new(config.job.clone()));

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        OrchestratorConfig::from(&config),
        token_provider,
        launcher_factory,
    ));

    match orchestrator.status().await {
        Ok(Some(status)) => info!(
            lock_id = %status.lock_id,
            state = ?status.state,
            "Found update in progress"
        ),
        Ok(None) => info!("No update in progress"),
        Err(e) => error!("Failed to read update status: {}", e),
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, orchestrator, license_fetcher));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
