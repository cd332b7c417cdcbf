//! Gateway-owned route definitions
//!
//! Everything else is attached by the route registrar.

use axum::{routing::get, Router};

use crate::handlers::health;
use crate::state::AppState;

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}
