use axum::extract::State;
use axum::Json;
use serde::Serialize;

use hms_db::StorageMode;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: StorageMode,
}

/// Liveness probe, also used by clients to find a reachable backend.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is healthy",
        mode: state.store.mode(),
    })
}
