//! leadwell-server library interface
//!
//! Exposes the router, state and services for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod seed;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::ReasoningClient;
use crate::storage::SharedStorage;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Selected storage backend
    pub storage: SharedStorage,
    /// Language-model client used by scoring, intake, insights and summaries
    pub reasoning: Arc<dyn ReasoningClient>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(storage: SharedStorage, reasoning: Arc<dyn ReasoningClient>) -> Self {
        Self {
            storage,
            reasoning,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::user_routes())
        .merge(api::lead_routes())
        .merge(api::call_routes())
        .merge(api::catalog_routes())
        .merge(api::form_submission_routes())
        .merge(api::insight_routes())
        .merge(api::stat_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
