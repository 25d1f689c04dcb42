//! Health check endpoint

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::AppState;

/// GET /health - Check API health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.config();
    let execution = match config.execution {
        corner_core::ExecutionPreference::Authoritative => "authoritative",
        corner_core::ExecutionPreference::Simulated => "simulated",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        execution: execution.to_string(),
        fallback_to_simulator: config.fallback_to_simulator,
    })
}
