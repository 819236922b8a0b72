//! Facades over the assignment and attempt services used by the sagas.
//!
//! Each facade has an in-process implementation that calls the service
//! directly and an HTTP implementation for when the services run elsewhere.

pub mod http;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use attempts::{AnswerInput, AttemptStatus, Score};
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

pub use http::{HttpAssignmentClient, HttpAttemptClient};
pub use local::{LocalAssignmentClient, LocalAttemptClient};

/// Eligibility decision as reported by the assignment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub reason: String,
}

/// Attempt returned by a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAttempt {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
}

/// Operations on the ledger-owning service.
#[async_trait]
pub trait AssignmentClient: Send + Sync {
    async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<EligibilityResponse, RemoteError>;

    async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError>;

    /// Gives back a reservation. Unknown keys are not an error.
    async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError>;
}

/// Operations on the attempt-owning service.
#[async_trait]
pub trait AttemptClient: Send + Sync {
    async fn create_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<CreatedAttempt, RemoteError>;

    async fn cancel_attempt(&self, attempt_id: AttemptId) -> Result<(), RemoteError>;

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerInput],
    ) -> Result<(), RemoteError>;

    async fn auto_score(&self, attempt_id: AttemptId) -> Result<Score, RemoteError>;

    async fn finalize_attempt(&self, attempt_id: AttemptId, score: Score)
    -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: AssignmentClient + ?Sized> AssignmentClient for Arc<T> {
    async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<EligibilityResponse, RemoteError> {
        (**self).check_eligibility(assignment_id, user_id).await
    }

    async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        (**self).reserve(assignment_id, user_id, key).await
    }

    async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        (**self).release(assignment_id, user_id, key).await
    }
}

#[async_trait]
impl<T: AttemptClient + ?Sized> AttemptClient for Arc<T> {
    async fn create_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<CreatedAttempt, RemoteError> {
        (**self).create_attempt(assignment_id, user_id, key).await
    }

    async fn cancel_attempt(&self, attempt_id: AttemptId) -> Result<(), RemoteError> {
        (**self).cancel_attempt(attempt_id).await
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerInput],
    ) -> Result<(), RemoteError> {
        (**self).submit_answers(attempt_id, answers).await
    }

    async fn auto_score(&self, attempt_id: AttemptId) -> Result<Score, RemoteError> {
        (**self).auto_score(attempt_id).await
    }

    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        score: Score,
    ) -> Result<(), RemoteError> {
        (**self).finalize_attempt(attempt_id, score).await
    }
}
