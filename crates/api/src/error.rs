//! API error types with HTTP response mapping.

use assignments::AssignmentError;
use attempts::AttemptError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger_store::StoreError;
use saga::{CompensationRecord, SagaError, SagaFailure};

/// API-level error type that maps to HTTP responses.
///
/// Bodies are `{"error": message, "code": code}`; the saga HTTP clients
/// classify failures by `code`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    NotEligible(String),
    /// Operation not allowed in the attempt's current status.
    InvalidState(String),
    /// A collaborator called by a saga failed.
    BadGateway(String),
    /// The start-attempt saga failed after running compensation.
    SagaCompensated {
        message: String,
        compensation: Vec<CompensationRecord>,
    },
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotEligible(_) => (StatusCode::BAD_REQUEST, "not_eligible"),
            ApiError::InvalidState(_) => (StatusCode::BAD_REQUEST, "invalid_state"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "remote_call_failed"),
            ApiError::SagaCompensated { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "saga_compensated")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = match self {
            ApiError::SagaCompensated {
                message,
                compensation,
            } => {
                tracing::error!(error = %message, "saga failed after compensation");
                serde_json::json!({
                    "error": message,
                    "code": code,
                    "compensation": compensation,
                })
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                serde_json::json!({ "error": message, "code": code })
            }
            ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::NotEligible(message)
            | ApiError::InvalidState(message)
            | ApiError::BadGateway(message) => {
                serde_json::json!({ "error": message, "code": code })
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AssignmentError::NotEligible(reason) => ApiError::NotEligible(reason.to_string()),
            AssignmentError::InvalidAssignment(msg) => ApiError::BadRequest(msg),
            AssignmentError::KeyConflict(_) => ApiError::BadRequest(err.to_string()),
            AssignmentError::FaultInjected(_)
            | AssignmentError::Store(_)
            | AssignmentError::Interrupted(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AttemptError::InvalidState { .. } => ApiError::InvalidState(err.to_string()),
            AttemptError::EmptyAnswers => ApiError::BadRequest(err.to_string()),
            AttemptError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match err {
            SagaError::NotEligible(reason) => ApiError::NotEligible(reason),
            SagaError::NotFound(msg) => ApiError::NotFound(msg),
            SagaError::InvalidState(msg) => ApiError::InvalidState(msg),
            SagaError::BadRequest(msg) => ApiError::BadRequest(msg),
            SagaError::RemoteCallFailure { .. } => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<SagaFailure> for ApiError {
    fn from(failure: SagaFailure) -> Self {
        if failure.compensated() {
            ApiError::SagaCompensated {
                message: failure.error.to_string(),
                compensation: failure.report.compensations().to_vec(),
            }
        } else {
            failure.error.into()
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
