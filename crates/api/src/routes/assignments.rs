//! Assignment, eligibility and reservation endpoints.

use std::sync::Arc;

use assignments::{Assignment, CreateAssignment, ReleaseOutcome, ReservationOutcome};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{AssignmentId, IdempotencyKey, UserId};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRequest {
    pub user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub user_id: UserId,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingQuery {
    pub user_id: UserId,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCreatedResponse {
    pub assignment_id: AssignmentId,
    pub max_attempts: u32,
}

#[derive(Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub reason: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingResponse {
    pub remaining_attempts: u32,
}

// -- Handlers --

/// POST /assignments: create an assignment.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAssignment>,
) -> Result<(StatusCode, Json<AssignmentCreatedResponse>), ApiError> {
    let assignment = state.assignments.create_assignment(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(AssignmentCreatedResponse {
            assignment_id: assignment.id,
            max_attempts: assignment.max_attempts,
        }),
    ))
}

/// GET /assignments/:id
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, ApiError> {
    let assignment = state.assignments.get_assignment(parse_id(&id)?).await?;
    Ok(Json(assignment))
}

/// POST /assignments/:id/check-eligibility
#[tracing::instrument(skip(state, req))]
pub async fn check_eligibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EligibilityRequest>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let eligibility = state
        .assignments
        .check_eligibility(parse_id(&id)?, &req.user_id)
        .await?;
    Ok(Json(EligibilityResponse {
        eligible: eligibility.is_eligible(),
        reason: eligibility.reason(),
    }))
}

/// POST /assignments/:id/reserve: idempotent per key.
#[tracing::instrument(skip(state, req))]
pub async fn reserve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let outcome = state
        .assignments
        .reserve(parse_id(&id)?, &req.user_id, &req.idempotency_key)
        .await?;
    Ok(Json(match outcome {
        ReservationOutcome::Reserved { used } => ReservationResponse {
            status: "reserved",
            used: Some(used),
        },
        ReservationOutcome::AlreadyApplied => ReservationResponse {
            status: "already_applied",
            used: None,
        },
    }))
}

/// POST /assignments/:id/release: never fails for unknown keys.
#[tracing::instrument(skip(state, req))]
pub async fn release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let outcome = state
        .assignments
        .release(parse_id(&id)?, &req.user_id, &req.idempotency_key)
        .await?;
    Ok(Json(match outcome {
        ReleaseOutcome::Released { used } => ReservationResponse {
            status: "released",
            used: Some(used),
        },
        ReleaseOutcome::NoOp(_) => ReservationResponse {
            status: "no_op",
            used: None,
        },
    }))
}

/// GET /assignments/:id/remaining-attempts?userId=
#[tracing::instrument(skip(state, query))]
pub async fn remaining_attempts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RemainingQuery>,
) -> Result<Json<RemainingResponse>, ApiError> {
    let remaining_attempts = state
        .assignments
        .remaining_attempts(parse_id(&id)?, &query.user_id)
        .await?;
    Ok(Json(RemainingResponse { remaining_attempts }))
}
