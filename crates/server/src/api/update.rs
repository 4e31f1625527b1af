use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use updater_core::UpdateStatus;

use super::error::ApiError;
use crate::state::AppState;

/// `active` is false when there is no lock file or when the one on disk is
/// a stale leftover waiting to be retired.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active: bool,
    #[serde(flatten)]
    pub update: Option<UpdateStatus>,
}

/// GET /update/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let update = state.orchestrator().status().await?;
    Ok(Json(StatusResponse {
        active: update.as_ref().is_some_and(|u| !u.stale),
        update,
    }))
}
