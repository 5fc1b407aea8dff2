//! API routes for funding overviews

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};
use server::{health_handler, HealthState};

use crate::api::handlers::*;

/// Create the overview router, `/health` included
pub fn create_router(state: OverviewApiState, health: HealthState) -> Router {
    let api = Router::new()
        .route("/api/v1/funding-overview", get(funding_overview))
        .route("/api/v1/metadata-cache", delete(invalidate_metadata))
        .with_state(Arc::new(state));

    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(Arc::new(health));

    api.merge(health)
}
