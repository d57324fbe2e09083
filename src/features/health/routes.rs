use axum::{routing::get, Router};

use crate::features::health::handlers::{
    debug_contents, health, liveness, test_connection, HealthState,
};

/// Create routes for health, connectivity and debug probes
pub fn routes(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/api/health", get(health))
        .route("/api/test-connection", get(test_connection))
        .route("/api/debug/contents", get(debug_contents))
        .with_state(state)
}
