//! Attempt lifecycle endpoints.

use std::sync::Arc;

use attempts::{AnswerInput, Attempt, AttemptStatus, Score};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptRequest {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerInput>,
}

#[derive(Serialize, Deserialize)]
pub struct ScoreBody {
    pub score: Score,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptCreatedResponse {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
}

/// POST /attempts: create an attempt, or return the one created for the key.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAttemptRequest>,
) -> Result<(StatusCode, Json<AttemptCreatedResponse>), ApiError> {
    let attempt = state
        .attempts
        .create(req.assignment_id, &req.user_id, &req.idempotency_key)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AttemptCreatedResponse {
            attempt_id: attempt.id,
            status: attempt.status,
        }),
    ))
}

/// GET /attempts/:id: attempt with its answers.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Attempt>, ApiError> {
    Ok(Json(state.attempts.get_attempt(parse_id(&id)?).await?))
}

/// POST /attempts/:id/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.attempts.cancel(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /attempts/:id/answers
#[tracing::instrument(skip(state, req))]
pub async fn submit_answers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .attempts
        .submit_answers(parse_id(&id)?, req.answers)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /attempts/:id/autoscore
#[tracing::instrument(skip(state))]
pub async fn auto_score(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScoreBody>, ApiError> {
    let score = state.attempts.auto_score(parse_id(&id)?).await?;
    Ok(Json(ScoreBody { score }))
}

/// POST /attempts/:id/finalize
#[tracing::instrument(skip(state, req))]
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ScoreBody>,
) -> Result<StatusCode, ApiError> {
    state.attempts.finalize(parse_id(&id)?, req.score).await?;
    Ok(StatusCode::NO_CONTENT)
}
