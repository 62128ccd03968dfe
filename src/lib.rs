//! Public write endpoint for short text entries.
//!
//! Submissions pass two cheap gates before they are stored: a per-client
//! cooldown and a check against the newest stored entry.

pub mod config;
pub mod duplicate;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod submission;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{health_handler, metrics_handler, save_text_handler};
use crate::state::AppState;

// POST only, from the configured origins, with credentials
pub fn cors_layer(allowed_origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins.iter().cloned()))
        .allow_methods([Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/save-text", post(save_text_handler))
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
