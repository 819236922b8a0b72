//! Saga run state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga run.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          ├──► Failed
///                          └──► Compensating ──► Failed
/// ```
///
/// A run that fails before anything was committed goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SagaState {
    #[default]
    NotStarted,

    /// Forward steps are being executed.
    Running,

    /// A step failed and compensating calls are in progress.
    Compensating,

    /// All forward steps succeeded (terminal state).
    Completed,

    /// A step failed; any compensation has finished (terminal state).
    Failed,
}

impl SagaState {
    pub fn can_run(&self) -> bool {
        matches!(self, SagaState::NotStarted)
    }

    /// Compensation only starts from a running saga.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, SagaState::Running | SagaState::Compensating)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "not_started",
            SagaState::Running => "running",
            SagaState::Compensating => "compensating",
            SagaState::Completed => "completed",
            SagaState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
