//! License refresh and job callback handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use updater_core::{JobMessage, LaunchOutcome, License};

use super::error::ApiError;
use crate::state::AppState;

/// Body posted by the update job.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub messages: Vec<JobMessage>,
}

/// POST /license/refresh
///
/// Fetches the license this server is entitled to and starts an update
/// towards it.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<LaunchOutcome>, ApiError> {
    let license = state.license_fetcher().fetch_license().await?;
    info!(
        components = license.components.len(),
        "Fetched license, launching update"
    );
    let outcome = state.orchestrator().launch_update(license).await?;
    Ok(Json(outcome))
}

/// POST /license/notify/{lock_id}
pub async fn notify(
    State(state): State<Arc<AppState>>,
    Path(lock_id): Path<String>,
    body: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    state
        .orchestrator()
        .notify(&lock_id, &request.messages)
        .await?;
    Ok(Json(json!({})))
}

/// GET /license
pub async fn get_installed(State(state): State<Arc<AppState>>) -> Result<Json<License>, ApiError> {
    let license = state.orchestrator().installed_license().await?;
    Ok(Json(license))
}
