//! In-process clients calling the services directly.

use std::sync::Arc;

use assignments::{AssignmentError, AssignmentService};
use async_trait::async_trait;
use attempts::{AnswerInput, AttemptError, AttemptService, Score};
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use ledger_store::{CounterStore, IdempotencyStore};

use super::{AssignmentClient, AttemptClient, CreatedAttempt, EligibilityResponse};
use crate::error::RemoteError;

impl From<AssignmentError> for RemoteError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::NotFound(_) => RemoteError::NotFound(err.to_string()),
            AssignmentError::NotEligible(reason) => RemoteError::NotEligible(reason.to_string()),
            AssignmentError::InvalidAssignment(msg) => RemoteError::BadRequest(msg),
            AssignmentError::KeyConflict(_) => RemoteError::BadRequest(err.to_string()),
            AssignmentError::FaultInjected(_)
            | AssignmentError::Store(_)
            | AssignmentError::Interrupted(_) => RemoteError::Status {
                status: 500,
                message: err.to_string(),
            },
        }
    }
}

impl From<AttemptError> for RemoteError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::NotFound(_) => RemoteError::NotFound(err.to_string()),
            AttemptError::InvalidState { .. } => RemoteError::InvalidState(err.to_string()),
            AttemptError::EmptyAnswers => RemoteError::BadRequest(err.to_string()),
            AttemptError::Store(_) => RemoteError::Status {
                status: 500,
                message: err.to_string(),
            },
        }
    }
}

/// Assignment client backed by a service in the same process.
pub struct LocalAssignmentClient<I, C> {
    service: Arc<AssignmentService<I, C>>,
}

impl<I, C> LocalAssignmentClient<I, C> {
    pub fn new(service: Arc<AssignmentService<I, C>>) -> Self {
        Self { service }
    }
}

impl<I, C> Clone for LocalAssignmentClient<I, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

#[async_trait]
impl<I, C> AssignmentClient for LocalAssignmentClient<I, C>
where
    I: IdempotencyStore + 'static,
    C: CounterStore + 'static,
{
    async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<EligibilityResponse, RemoteError> {
        let eligibility = self
            .service
            .check_eligibility(assignment_id, user_id)
            .await?;
        Ok(EligibilityResponse {
            eligible: eligibility.is_eligible(),
            reason: eligibility.reason().to_string(),
        })
    }

    async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        self.service.reserve(assignment_id, user_id, key).await?;
        Ok(())
    }

    async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<(), RemoteError> {
        self.service.release(assignment_id, user_id, key).await?;
        Ok(())
    }
}

/// Attempt client backed by a service in the same process.
pub struct LocalAttemptClient<I> {
    service: Arc<AttemptService<I>>,
}

impl<I> LocalAttemptClient<I> {
    pub fn new(service: Arc<AttemptService<I>>) -> Self {
        Self { service }
    }
}

impl<I> Clone for LocalAttemptClient<I> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

#[async_trait]
impl<I: IdempotencyStore> AttemptClient for LocalAttemptClient<I> {
    async fn create_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<CreatedAttempt, RemoteError> {
        let attempt = self.service.create(assignment_id, user_id, key).await?;
        Ok(CreatedAttempt {
            attempt_id: attempt.id,
            status: attempt.status,
        })
    }

    async fn cancel_attempt(&self, attempt_id: AttemptId) -> Result<(), RemoteError> {
        Ok(self.service.cancel(attempt_id).await?)
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerInput],
    ) -> Result<(), RemoteError> {
        Ok(self
            .service
            .submit_answers(attempt_id, answers.to_vec())
            .await?)
    }

    async fn auto_score(&self, attempt_id: AttemptId) -> Result<Score, RemoteError> {
        Ok(self.service.auto_score(attempt_id).await?)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        score: Score,
    ) -> Result<(), RemoteError> {
        Ok(self.service.finalize(attempt_id, score).await?)
    }
}
