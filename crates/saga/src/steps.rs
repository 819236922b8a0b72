//! Saga and step names.

/// Saga name: reserve and create a new attempt.
pub const START_ATTEMPT: &str = "start_attempt";

/// Saga name: answer, score and finalize an attempt.
pub const SUBMIT_ATTEMPT: &str = "submit_attempt";

pub const STEP_CHECK_ELIGIBILITY: &str = "check_eligibility";
pub const STEP_CREATE_ATTEMPT: &str = "create_attempt";
pub const STEP_RESERVE: &str = "reserve";

/// Compensation for `create_attempt`.
pub const STEP_CANCEL_ATTEMPT: &str = "cancel_attempt";

/// Compensation for `reserve`.
pub const STEP_RELEASE: &str = "release";

pub const STEP_SUBMIT_ANSWERS: &str = "submit_answers";
pub const STEP_AUTO_SCORE: &str = "auto_score";
pub const STEP_FINALIZE: &str = "finalize";
