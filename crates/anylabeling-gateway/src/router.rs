use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::health::HealthStatus;
use crate::state::SharedState;

/// Build the router exposed by the bootstrap layer.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> Json<HealthStatus> {
    Json(state.health.report())
}
