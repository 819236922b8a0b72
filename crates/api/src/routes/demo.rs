//! Fault injection switch for demonstrating compensation.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailReserveResponse {
    pub fail_reserve: bool,
}

fn set(state: &AppState, fail: bool) -> Json<FailReserveResponse> {
    state.assignments.demo_flags().set_fail_reserve(fail);
    tracing::warn!(fail_reserve = fail, "reserve fault injection toggled");
    Json(FailReserveResponse { fail_reserve: fail })
}

/// POST /demo/fail-reserve/on
pub async fn fail_reserve_on(State(state): State<Arc<AppState>>) -> Json<FailReserveResponse> {
    set(&state, true)
}

/// POST /demo/fail-reserve/off
pub async fn fail_reserve_off(State(state): State<Arc<AppState>>) -> Json<FailReserveResponse> {
    set(&state, false)
}

/// GET /demo/fail-reserve
pub async fn fail_reserve_status(
    State(state): State<Arc<AppState>>,
) -> Json<FailReserveResponse> {
    Json(FailReserveResponse {
        fail_reserve: state.assignments.demo_flags().fail_reserve(),
    })
}
