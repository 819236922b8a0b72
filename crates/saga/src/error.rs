//! Saga error types.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to the assignment or attempt service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The target assignment or attempt does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The ledger refused the reservation.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// The attempt is not in a status that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request was rejected as malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The service answered with an unexpected status.
    #[error("Remote service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never completed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The step did not finish within its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced to saga callers.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Eligibility check refused the user.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// The target assignment or attempt does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The attempt is not in a status that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request was rejected as malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A step failed for any other reason.
    #[error("Saga step '{step}' failed: {source}")]
    RemoteCallFailure {
        step: &'static str,
        #[source]
        source: RemoteError,
    },
}

impl SagaError {
    /// Wraps a step failure, keeping it opaque to the caller.
    pub fn remote(step: &'static str, source: RemoteError) -> Self {
        SagaError::RemoteCallFailure { step, source }
    }

    /// Surfaces the collaborator's own classification where one exists.
    pub fn propagate(step: &'static str, source: RemoteError) -> Self {
        match source {
            RemoteError::NotFound(msg) => SagaError::NotFound(msg),
            RemoteError::NotEligible(msg) => SagaError::NotEligible(msg),
            RemoteError::InvalidState(msg) => SagaError::InvalidState(msg),
            RemoteError::BadRequest(msg) => SagaError::BadRequest(msg),
            other => SagaError::remote(step, other),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagate_keeps_classification() {
        let err = SagaError::propagate("submit_answers", RemoteError::NotFound("x".into()));
        assert!(matches!(err, SagaError::NotFound(_)));

        let err = SagaError::propagate("finalize", RemoteError::InvalidState("x".into()));
        assert!(matches!(err, SagaError::InvalidState(_)));
    }

    #[test]
    fn test_propagate_wraps_transport_failures() {
        let err = SagaError::propagate("auto_score", RemoteError::Timeout(Duration::from_secs(1)));
        assert!(matches!(
            err,
            SagaError::RemoteCallFailure {
                step: "auto_score",
                ..
            }
        ));
        assert!(err.to_string().contains("auto_score"));
    }
}
