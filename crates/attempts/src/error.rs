//! Attempt lifecycle error types.

use common::AttemptId;
use ledger_store::StoreError;
use thiserror::Error;

use crate::status::AttemptStatus;

/// Errors that can occur during attempt operations.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The attempt does not exist.
    #[error("Attempt not found: {0}")]
    NotFound(AttemptId),

    /// The operation is not allowed in the attempt's current status.
    #[error("Cannot {action} attempt {attempt_id} in status {status}")]
    InvalidState {
        attempt_id: AttemptId,
        status: AttemptStatus,
        action: &'static str,
    },

    /// An answer submission contained no answers.
    #[error("Answer list must not be empty")]
    EmptyAnswers,

    /// Idempotency storage failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for attempt results.
pub type Result<T> = std::result::Result<T, AttemptError>;
