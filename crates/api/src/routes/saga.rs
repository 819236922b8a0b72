//! Saga trigger endpoints.

use std::sync::Arc;

use attempts::AnswerInput;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{AssignmentId, AttemptId};
use saga::{StartedAttempt, SubmittedAttempt};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub assignment_id: AssignmentId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub attempt_id: AttemptId,
    pub answers: Vec<AnswerInput>,
}

/// POST /saga/start-attempt: run the start-attempt saga for the demo user.
#[tracing::instrument(skip(state, req), fields(assignment_id = %req.assignment_id))]
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<StartedAttempt>), ApiError> {
    let started = state.saga.start_attempt(req.assignment_id).await?;
    Ok((StatusCode::ACCEPTED, Json(started)))
}

/// POST /saga/submit-attempt: submit, score and finalize in one call.
#[tracing::instrument(skip(state, req), fields(attempt_id = %req.attempt_id))]
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmittedAttempt>, ApiError> {
    let submitted = state
        .saga
        .submit_attempt(req.attempt_id, req.answers)
        .await?;
    Ok(Json(submitted))
}
