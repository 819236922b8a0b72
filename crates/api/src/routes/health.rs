//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub ledger: &'static str,
    pub saga_clients: &'static str,
}

/// GET /health: liveness plus the ledger backend and saga wiring in use.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ledger: state.ledger.as_str(),
        saga_clients: if state.remote_sagas { "http" } else { "local" },
    })
}
