//! Saga coordination for quiz attempts.
//!
//! Two sagas span the assignment service (eligibility and the reservation
//! ledger) and the attempt service (attempt lifecycle):
//!
//! Start attempt:
//! 1. Check eligibility
//! 2. Create attempt
//! 3. Reserve an attempt in the ledger
//!
//! If the reservation fails, the attempt is cancelled and the reservation is
//! released, both best-effort.
//!
//! Submit attempt:
//! 1. Submit answers
//! 2. Auto-score
//! 3. Finalize
//!
//! Submit attempt has no compensation; failures propagate as they are.

pub mod clients;
pub mod coordinator;
pub mod error;
pub mod report;
pub mod state;
pub mod steps;

pub use clients::{
    AssignmentClient, AttemptClient, CreatedAttempt, EligibilityResponse, HttpAssignmentClient,
    HttpAttemptClient, LocalAssignmentClient, LocalAttemptClient,
};
pub use coordinator::{SagaConfig, SagaCoordinator, StartedAttempt, SubmittedAttempt};
pub use error::{RemoteError, Result, SagaError};
pub use report::{CompensationRecord, SagaFailure, SagaReport};
pub use state::SagaState;
