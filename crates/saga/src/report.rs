//! Record of what a saga run did, including compensation outcomes.

use serde::Serialize;

use crate::error::SagaError;
use crate::state::SagaState;

/// Outcome of one compensating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationRecord {
    pub step: &'static str,
    /// `None` when the call succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompensationRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Progress of a single saga run.
///
/// Compensation failures are recorded here and never replace the error
/// that triggered compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaReport {
    saga: &'static str,
    state: SagaState,
    completed_steps: Vec<&'static str>,
    failed_step: Option<&'static str>,
    compensations: Vec<CompensationRecord>,
}

impl SagaReport {
    /// Starts a report for a running saga.
    pub fn begin(saga: &'static str) -> Self {
        Self {
            saga,
            state: SagaState::Running,
            completed_steps: Vec::new(),
            failed_step: None,
            compensations: Vec::new(),
        }
    }

    pub fn saga(&self) -> &'static str {
        self.saga
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn completed_steps(&self) -> &[&'static str] {
        &self.completed_steps
    }

    pub fn failed_step(&self) -> Option<&'static str> {
        self.failed_step
    }

    pub fn compensations(&self) -> &[CompensationRecord] {
        &self.compensations
    }

    pub fn compensation_failures(&self) -> usize {
        self.compensations.iter().filter(|c| !c.succeeded()).count()
    }

    pub(crate) fn step_completed(&mut self, step: &'static str) {
        self.completed_steps.push(step);
    }

    pub(crate) fn step_failed(&mut self, step: &'static str) {
        self.failed_step = Some(step);
    }

    pub(crate) fn begin_compensation(&mut self) {
        if self.state.can_compensate() {
            self.state = SagaState::Compensating;
        }
    }

    pub(crate) fn record_compensation(&mut self, step: &'static str, error: Option<String>) {
        self.compensations.push(CompensationRecord { step, error });
    }

    pub(crate) fn complete(&mut self) {
        if self.state.can_complete() {
            self.state = SagaState::Completed;
        }
    }

    pub(crate) fn fail(&mut self) {
        if self.state.can_fail() {
            self.state = SagaState::Failed;
        }
    }
}

/// A failed saga run: the error that stopped it plus what was undone.
#[derive(Debug)]
pub struct SagaFailure {
    pub error: SagaError,
    pub report: SagaReport,
}

impl SagaFailure {
    pub fn compensated(&self) -> bool {
        !self.report.compensations.is_empty()
    }
}

impl std::fmt::Display for SagaFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for SagaFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
