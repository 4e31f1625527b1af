//! Common test utilities for driving the HTTP API with mocks.
//!
//! This module provides a test fixture that builds the router in-process with
//! mock collaborators injected and the lock/license directories in a temp dir,
//! so the API can be tested without a token service, a license server or a
//! Kubernetes cluster.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use updater_core::{
    lock::LOCK_FILE_NAME,
    testing::{MockJobLauncherFactory, MockLicenseFetcher, MockTokenProvider},
    Config, JobConfig, License, LicenseServerConfig, OrchestratorConfig, ServerConfig,
    StorageConfig, StsConfig, UpdateConfig, UpdateOrchestrator,
};

/// Re-export fixtures for test convenience
pub use updater_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_refresh() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/license/refresh", json!({})).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock token provider - control credential failures
    pub tokens: Arc<MockTokenProvider>,
    /// Mock job launcher factory - inspect started jobs
    pub jobs: Arc<MockJobLauncherFactory>,
    /// Mock license fetcher - configure the license served by "the license server"
    pub license_fetcher: Arc<MockLicenseFetcher>,
    /// Temporary directory holding the lock and license directories
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture serving a license with a single `web` component.
    pub async fn new() -> Self {
        Self::with_license(fixtures::license(&["web"])).await
    }

    /// Create a test fixture whose license server serves `license`.
    pub async fn with_license(license: License) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let lock_dir = temp_dir.path().join("lock");
        let license_dir = temp_dir.path().join("license");
        std::fs::create_dir_all(&lock_dir).expect("Failed to create lock dir");
        std::fs::create_dir_all(&license_dir).expect("Failed to create license dir");

        // Create mocks
        let tokens = Arc::new(MockTokenProvider::new("update-token"));
        let jobs = Arc::new(MockJobLauncherFactory::new());
        let license_fetcher = Arc::new(MockLicenseFetcher::new(license));

        // Create config
        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                lock_dir,
                license_dir,
            },
            update: UpdateConfig {
                callback_endpoint: "http://updater.local/api/v1/license/notify".to_string(),
                credential_provider_endpoint: "https://credentials.example.com/token"
                    .to_string(),
                secret_prefix: "regcred".to_string(),
            },
            sts: StsConfig {
                endpoint: "https://sts.example.com/token".to_string(),
                server_api_key: "sts-secret".to_string(),
                timeout_secs: 5,
            },
            license_server: LicenseServerConfig {
                endpoint: "https://licenses.example.com/servers/:serverId/license".to_string(),
                server_id: "server-1".to_string(),
                server_api_key: "license-secret".to_string(),
                timeout_secs: 5,
            },
            job: JobConfig::default(),
        };

        let orchestrator = Arc::new(UpdateOrchestrator::new(
            OrchestratorConfig::from(&config),
            Arc::clone(&tokens) as Arc<dyn updater_core::TokenProvider>,
            Arc::clone(&jobs) as Arc<dyn updater_core::JobLauncherFactory>,
        ));

        // Create app state with mocks
        let state = Arc::new(updater_server::state::AppState::new(
            config,
            orchestrator,
            Arc::clone(&license_fetcher) as Arc<dyn updater_core::LicenseFetcher>,
        ));

        // Create router
        let router = updater_server::api::create_router(state);

        Self {
            router,
            tokens,
            jobs,
            license_fetcher,
            temp_dir,
        }
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.temp_dir.path().join("lock")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.lock_dir().join(LOCK_FILE_NAME)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let request_builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => request_builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => request_builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// JSON for a job message as the update agent posts it.
pub fn message_json(kind: &str, text: &str) -> Value {
    serde_json::json!({
        "kind": kind,
        "timestamp": 1_700_000_000_000i64,
        "message": text,
    })
}
