//! Attempt service owning attempts and their answers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use ledger_store::{Application, IdempotencyGuard, IdempotencyStore, StoreError};
use tokio::sync::RwLock;

use crate::attempt::{AnswerInput, Attempt};
use crate::error::{AttemptError, Result};
use crate::score::Score;
use crate::status::AttemptStatus;

/// Idempotency scope for attempt creation.
pub const ATTEMPT_CREATE_SCOPE: &str = "attempt-create";

/// Service implementing the attempt lifecycle.
///
/// Attempts are held in memory. Creation is deduplicated through an
/// [`IdempotencyGuard`] that records the created attempt id with the key.
pub struct AttemptService<I> {
    attempts: Arc<RwLock<HashMap<AttemptId, Attempt>>>,
    guard: IdempotencyGuard<I>,
}

impl<I: IdempotencyStore> AttemptService<I> {
    pub fn new(idempotency: I) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            guard: IdempotencyGuard::new(idempotency, ATTEMPT_CREATE_SCOPE),
        }
    }

    /// Creates a `PENDING` attempt, or returns the one already created for `key`.
    #[tracing::instrument(skip_all, fields(%assignment_id, %user_id, %key))]
    pub async fn create(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<Attempt> {
        let mut attempts = self.attempts.write().await;

        let id = AttemptId::new();
        match self.guard.try_apply_with(key, &id.to_string()).await? {
            Application::FirstTime => {
                let attempt =
                    Attempt::start(id, assignment_id, user_id.clone(), key.clone(), Utc::now());
                attempts.insert(id, attempt.clone());
                metrics::counter!("attempts_created_total").increment(1);
                tracing::info!(attempt_id = %id, "attempt created");
                Ok(attempt)
            }
            Application::AlreadyApplied(recorded) => {
                let existing: AttemptId = recorded.parse().map_err(|_| {
                    StoreError::Corrupt(format!("recorded attempt id '{recorded}' is not a uuid"))
                })?;
                let attempt = attempts.get(&existing).cloned().ok_or_else(|| {
                    StoreError::Corrupt(format!("attempt {existing} recorded for key is missing"))
                })?;
                tracing::info!(attempt_id = %existing, "idempotency key already applied, returning existing attempt");
                Ok(attempt)
            }
        }
    }

    /// Loads an attempt with its answers.
    pub async fn get_attempt(&self, id: AttemptId) -> Result<Attempt> {
        self.attempts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AttemptError::NotFound(id))
    }

    /// Lists a user's attempts at an assignment, oldest first.
    pub async fn attempts_for(&self, assignment_id: AssignmentId, user_id: &UserId) -> Vec<Attempt> {
        let mut found: Vec<Attempt> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.assignment_id == assignment_id && &a.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.started_at);
        found
    }

    /// Cancels a `PENDING` attempt.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: AttemptId) -> Result<()> {
        self.with_pending(id, "cancel", AttemptStatus::can_cancel, |attempt| {
            attempt.finish(AttemptStatus::Canceled, Utc::now());
        })
        .await?;
        tracing::info!("attempt cancelled");
        Ok(())
    }

    /// Upserts answers by question id. The last write per question wins.
    #[tracing::instrument(skip(self, answers), fields(count = answers.len()))]
    pub async fn submit_answers(&self, id: AttemptId, answers: Vec<AnswerInput>) -> Result<()> {
        if answers.is_empty() {
            return Err(AttemptError::EmptyAnswers);
        }
        self.with_pending(
            id,
            "submit answers to",
            AttemptStatus::can_submit_answers,
            |attempt| {
                for answer in answers {
                    attempt.upsert_answer(answer);
                }
            },
        )
        .await?;
        tracing::info!("answers submitted");
        Ok(())
    }

    /// Grades every stored answer and returns the score. Does not change status.
    #[tracing::instrument(skip(self))]
    pub async fn auto_score(&self, id: AttemptId) -> Result<Score> {
        let score = self
            .with_pending(id, "score", AttemptStatus::can_score, Attempt::grade_answers)
            .await?;
        tracing::info!(%score, "attempt scored");
        Ok(score)
    }

    /// Marks the attempt `SUBMITTED` with the given score.
    #[tracing::instrument(skip(self))]
    pub async fn finalize(&self, id: AttemptId, score: Score) -> Result<()> {
        self.with_pending(id, "finalize", AttemptStatus::can_finalize, |attempt| {
            attempt.score = Some(score);
            attempt.finish(AttemptStatus::Submitted, Utc::now());
        })
        .await?;
        metrics::counter!("attempts_finalized_total").increment(1);
        tracing::info!("attempt finalized");
        Ok(())
    }

    async fn with_pending<T>(
        &self,
        id: AttemptId,
        action: &'static str,
        allowed: fn(&AttemptStatus) -> bool,
        apply: impl FnOnce(&mut Attempt) -> T,
    ) -> Result<T> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts.get_mut(&id).ok_or(AttemptError::NotFound(id))?;

        if !allowed(&attempt.status) {
            tracing::warn!(status = %attempt.status, action, "illegal attempt transition");
            return Err(AttemptError::InvalidState {
                attempt_id: id,
                status: attempt.status,
                action,
            });
        }
        Ok(apply(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_store::InMemoryIdempotencyStore;

    fn service() -> AttemptService<InMemoryIdempotencyStore> {
        AttemptService::new(InMemoryIdempotencyStore::new())
    }

    async fn pending(service: &AttemptService<InMemoryIdempotencyStore>) -> Attempt {
        service
            .create(
                AssignmentId::new(),
                &UserId::new("u"),
                &IdempotencyKey::generate(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let service = service();
        let attempt = pending(&service).await;

        assert_eq!(attempt.status, AttemptStatus::Pending);
        assert!(attempt.finished_at.is_none());
        assert!(attempt.score.is_none());
        assert!(attempt.answers.is_empty());
    }

    #[tokio::test]
    async fn test_create_is_idempotent_per_key() {
        let service = service();
        let assignment = AssignmentId::new();
        let user = UserId::new("u");
        let key = IdempotencyKey::new("k");

        let first = service.create(assignment, &user, &key).await.unwrap();
        let second = service.create(assignment, &user, &key).await.unwrap();
        let other = service
            .create(assignment, &user, &IdempotencyKey::new("k2"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_cancel_sets_finished_at() {
        let service = service();
        let attempt = pending(&service).await;

        service.cancel(attempt.id).await.unwrap();

        let loaded = service.get_attempt(attempt.id).await.unwrap();
        assert_eq!(loaded.status, AttemptStatus::Canceled);
        assert!(loaded.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_invalid_state() {
        let service = service();
        let attempt = pending(&service).await;

        service.cancel(attempt.id).await.unwrap();
        let result = service.cancel(attempt.id).await;

        assert!(matches!(
            result,
            Err(AttemptError::InvalidState {
                status: AttemptStatus::Canceled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_attempt() {
        let service = service();
        let id = AttemptId::new();

        assert!(matches!(
            service.cancel(id).await,
            Err(AttemptError::NotFound(_))
        ));
        assert!(matches!(
            service.auto_score(id).await,
            Err(AttemptError::NotFound(_))
        ));
        assert!(matches!(
            service.get_attempt(id).await,
            Err(AttemptError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_answers_rejected() {
        let service = service();
        let attempt = pending(&service).await;

        let result = service.submit_answers(attempt.id, vec![]).await;
        assert!(matches!(result, Err(AttemptError::EmptyAnswers)));
    }

    #[tokio::test]
    async fn test_auto_score_without_answers_is_zero() {
        let service = service();
        let attempt = pending(&service).await;

        assert_eq!(service.auto_score(attempt.id).await.unwrap(), Score::ZERO);
    }

    #[tokio::test]
    async fn test_auto_score_persists_flags_without_transition() {
        let service = service();
        let attempt = pending(&service).await;
        service
            .submit_answers(
                attempt.id,
                vec![AnswerInput::option(1, "correct"), AnswerInput::option(2, "no")],
            )
            .await
            .unwrap();

        let score = service.auto_score(attempt.id).await.unwrap();

        assert_eq!(score.to_string(), "5.00");
        let loaded = service.get_attempt(attempt.id).await.unwrap();
        assert_eq!(loaded.status, AttemptStatus::Pending);
        assert_eq!(loaded.answer(1).unwrap().is_correct, Some(true));
        assert_eq!(loaded.answer(2).unwrap().is_correct, Some(false));
    }

    #[tokio::test]
    async fn test_finalized_attempt_is_frozen() {
        let service = service();
        let attempt = pending(&service).await;
        service
            .finalize(attempt.id, Score::from_hundredths(500))
            .await
            .unwrap();

        let answers = service
            .submit_answers(attempt.id, vec![AnswerInput::option(1, "correct")])
            .await;
        let score = service.auto_score(attempt.id).await;
        let cancel = service.cancel(attempt.id).await;
        let finalize = service.finalize(attempt.id, Score::ZERO).await;

        for result in [answers, cancel, finalize] {
            assert!(matches!(result, Err(AttemptError::InvalidState { .. })));
        }
        assert!(matches!(score, Err(AttemptError::InvalidState { .. })));

        let loaded = service.get_attempt(attempt.id).await.unwrap();
        assert_eq!(loaded.status, AttemptStatus::Submitted);
        assert_eq!(loaded.score, Some(Score::from_hundredths(500)));
        assert!(loaded.answers.is_empty());
    }
}
