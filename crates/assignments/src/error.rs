//! Assignment and ledger error types.

use common::{AssignmentId, IdempotencyKey};
use ledger_store::StoreError;
use thiserror::Error;

use crate::eligibility::IneligibilityReason;

/// Errors that can occur during assignment and reservation operations.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The assignment does not exist.
    #[error("Assignment not found: {0}")]
    NotFound(AssignmentId),

    /// The user may not reserve an attempt right now.
    #[error("Not eligible: {0}")]
    NotEligible(IneligibilityReason),

    /// The assignment definition is invalid.
    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),

    /// Reservation was rejected by the demo fault flag.
    #[error("Reservation failed: {0}")]
    FaultInjected(String),

    /// The key already reserved an attempt for a different assignment or user.
    #[error("Idempotency key {0} is bound to another assignment or user")]
    KeyConflict(IdempotencyKey),

    /// Ledger storage failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The task running a ledger mutation panicked or was aborted.
    #[error("Ledger task failed: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Convenience type alias for assignment results.
pub type Result<T> = std::result::Result<T, AssignmentError>;
