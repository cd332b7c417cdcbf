//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check
///
/// Reports the store connectivity status and whether cross-process event
/// delivery is currently degraded to local-only.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_connected = state.store().is_connected();
    let fanout_degraded = state.transport().is_degraded();

    let status = if store_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "store": if store_connected { "connected" } else { "reconnecting" },
        "fanout_degraded": fanout_degraded,
        "sessions": state.transport().connections().connection_count(),
    });

    (status, Json(body))
}
