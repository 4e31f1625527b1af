use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::license;
use super::middleware::metrics_middleware;
use super::update;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/license", get(license::get_installed))
        .route("/license/refresh", post(license::refresh))
        .route("/license/notify/{lock_id}", post(license::notify))
        .route("/update/status", get(update::get_status));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
