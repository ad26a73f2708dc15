//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::config::RelayMode;
use crate::types::HealthResponse;

pub async fn health(State(state): State<Arc<crate::AppState>>) -> Json<HealthResponse> {
    let mode = match state.config.mode {
        RelayMode::Api => "api",
        RelayMode::Gateway => "gateway",
    };
    Json(HealthResponse {
        status: "ok".into(),
        mode: mode.into(),
    })
}
