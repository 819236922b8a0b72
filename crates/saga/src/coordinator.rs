//! Saga coordinator for the start-attempt and submit-attempt sagas.

use std::future::Future;
use std::time::{Duration, Instant};

use attempts::{AnswerInput, AttemptStatus, Score};
use common::{AssignmentId, AttemptId, IdempotencyKey, UserId};
use serde::Serialize;

use crate::clients::{AssignmentClient, AttemptClient, CreatedAttempt};
use crate::error::{RemoteError, SagaError};
use crate::report::{SagaFailure, SagaReport};
use crate::steps;

/// Default deadline for a single saga step.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// The "current user" on whose behalf attempts are started.
    pub user_id: UserId,
    /// Deadline applied to every remote call, including compensation.
    pub step_timeout: Duration,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            user_id: UserId::new("demo-user"),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

/// Result of a successful start-attempt saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedAttempt {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
}

/// Result of a successful submit-attempt saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAttempt {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
    pub score: Score,
}

/// Orchestrates the attempt sagas over the two service facades.
///
/// The coordinator owns no state; every step is a sequential call to the
/// assignment or attempt service, bounded by `step_timeout`.
pub struct SagaCoordinator<A, T> {
    assignments: A,
    attempts: T,
    config: SagaConfig,
}

impl<A, T> SagaCoordinator<A, T>
where
    A: AssignmentClient,
    T: AttemptClient,
{
    pub fn new(assignments: A, attempts: T, config: SagaConfig) -> Self {
        Self {
            assignments,
            attempts,
            config,
        }
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Checks eligibility, creates an attempt and reserves it.
    ///
    /// A failed reservation cancels the attempt and releases the key before
    /// the step error is returned. Compensation failures are recorded in the
    /// report, never returned in place of the step error.
    #[tracing::instrument(skip(self), fields(saga = steps::START_ATTEMPT, user_id = %self.config.user_id))]
    pub async fn start_attempt(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<StartedAttempt, SagaFailure> {
        metrics::counter!("saga_executions_total", "saga" => steps::START_ATTEMPT).increment(1);
        let saga_start = Instant::now();
        let mut report = SagaReport::begin(steps::START_ATTEMPT);

        let result = self.run_start_attempt(assignment_id, &mut report).await;
        finish(&mut report, saga_start, result.as_ref().err());

        result.map_err(|error| SagaFailure { error, report })
    }

    async fn run_start_attempt(
        &self,
        assignment_id: AssignmentId,
        report: &mut SagaReport,
    ) -> Result<StartedAttempt, SagaError> {
        let user_id = &self.config.user_id;
        let key = IdempotencyKey::generate();

        // Step A: nothing committed yet, failures need no compensation.
        let eligibility = self
            .step(
                report,
                steps::STEP_CHECK_ELIGIBILITY,
                self.assignments.check_eligibility(assignment_id, user_id),
            )
            .await
            .map_err(|e| SagaError::propagate(steps::STEP_CHECK_ELIGIBILITY, e))?;
        if !eligibility.eligible {
            tracing::warn!(reason = %eligibility.reason, "user not eligible");
            return Err(SagaError::NotEligible(eligibility.reason));
        }

        // Step B: a failed create leaves nothing behind.
        let created: CreatedAttempt = self
            .step(
                report,
                steps::STEP_CREATE_ATTEMPT,
                self.attempts.create_attempt(assignment_id, user_id, &key),
            )
            .await
            .map_err(|e| SagaError::remote(steps::STEP_CREATE_ATTEMPT, e))?;

        // Step C
        if let Err(e) = self
            .step(
                report,
                steps::STEP_RESERVE,
                self.assignments.reserve(assignment_id, user_id, &key),
            )
            .await
        {
            report.begin_compensation();
            self.compensate(
                report,
                steps::STEP_CANCEL_ATTEMPT,
                self.attempts.cancel_attempt(created.attempt_id),
            )
            .await;
            self.compensate(
                report,
                steps::STEP_RELEASE,
                self.assignments.release(assignment_id, user_id, &key),
            )
            .await;
            return Err(SagaError::remote(steps::STEP_RESERVE, e));
        }

        tracing::info!(attempt_id = %created.attempt_id, "attempt started");
        Ok(StartedAttempt {
            attempt_id: created.attempt_id,
            status: created.status,
        })
    }

    /// Submits answers, scores and finalizes an attempt.
    ///
    /// There is no compensation: answers stay stored if scoring or
    /// finalizing fails, and the error is returned unwrapped.
    #[tracing::instrument(skip(self, answers), fields(saga = steps::SUBMIT_ATTEMPT, answers = answers.len()))]
    pub async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        answers: Vec<AnswerInput>,
    ) -> Result<SubmittedAttempt, SagaError> {
        metrics::counter!("saga_executions_total", "saga" => steps::SUBMIT_ATTEMPT).increment(1);
        let saga_start = Instant::now();
        let mut report = SagaReport::begin(steps::SUBMIT_ATTEMPT);

        let result = self
            .run_submit_attempt(attempt_id, &answers, &mut report)
            .await;
        finish(&mut report, saga_start, result.as_ref().err());
        result
    }

    async fn run_submit_attempt(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerInput],
        report: &mut SagaReport,
    ) -> Result<SubmittedAttempt, SagaError> {
        self.step(
            report,
            steps::STEP_SUBMIT_ANSWERS,
            self.attempts.submit_answers(attempt_id, answers),
        )
        .await
        .map_err(|e| SagaError::propagate(steps::STEP_SUBMIT_ANSWERS, e))?;

        let score = self
            .step(
                report,
                steps::STEP_AUTO_SCORE,
                self.attempts.auto_score(attempt_id),
            )
            .await
            .map_err(|e| SagaError::propagate(steps::STEP_AUTO_SCORE, e))?;

        self.step(
            report,
            steps::STEP_FINALIZE,
            self.attempts.finalize_attempt(attempt_id, score),
        )
        .await
        .map_err(|e| SagaError::propagate(steps::STEP_FINALIZE, e))?;

        tracing::info!(%attempt_id, %score, "attempt submitted");
        Ok(SubmittedAttempt {
            attempt_id,
            status: AttemptStatus::Submitted,
            score,
        })
    }

    /// Runs one forward step under the step deadline.
    async fn step<R>(
        &self,
        report: &mut SagaReport,
        step: &'static str,
        call: impl Future<Output = Result<R, RemoteError>>,
    ) -> Result<R, RemoteError> {
        tracing::info!(step, "saga step started");
        match self.bounded(call).await {
            Ok(value) => {
                report.step_completed(step);
                tracing::info!(step, "saga step completed");
                Ok(value)
            }
            Err(e) => {
                report.step_failed(step);
                tracing::warn!(step, error = %e, "saga step failed");
                Err(e)
            }
        }
    }

    /// Runs one compensating call. Failures are logged and recorded only.
    async fn compensate(
        &self,
        report: &mut SagaReport,
        step: &'static str,
        call: impl Future<Output = Result<(), RemoteError>>,
    ) {
        match self.bounded(call).await {
            Ok(()) => {
                tracing::info!(step, "compensation step completed");
                report.record_compensation(step, None);
            }
            Err(e) => {
                metrics::counter!("saga_compensations_failed").increment(1);
                tracing::error!(step, error = %e, "compensation step failed");
                report.record_compensation(step, Some(e.to_string()));
            }
        }
    }

    async fn bounded<R>(
        &self,
        call: impl Future<Output = Result<R, RemoteError>>,
    ) -> Result<R, RemoteError> {
        let timeout = self.config.step_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(timeout)))
    }
}

fn finish(report: &mut SagaReport, saga_start: Instant, error: Option<&SagaError>) {
    let saga = report.saga();
    let duration = saga_start.elapsed().as_secs_f64();
    metrics::histogram!("saga_duration_seconds", "saga" => saga).record(duration);

    match error {
        None => {
            report.complete();
            metrics::counter!("saga_completed", "saga" => saga).increment(1);
            tracing::info!(duration, "saga completed successfully");
        }
        Some(e) => {
            report.fail();
            metrics::counter!("saga_failed", "saga" => saga).increment(1);
            tracing::warn!(
                duration,
                error = %e,
                failed_step = report.failed_step().unwrap_or("none"),
                compensation_failures = report.compensation_failures(),
                "saga failed"
            );
        }
    }
}
