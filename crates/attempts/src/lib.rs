//! Attempt-owning side of the quiz attempt workflow.
//!
//! An attempt starts `PENDING`, collects answers, is scored and then either
//! finalized to `SUBMITTED` or cancelled. Both terminal states are final.

pub mod attempt;
pub mod error;
pub mod score;
pub mod service;
pub mod status;

pub use attempt::{Answer, AnswerInput, Attempt};
pub use error::{AttemptError, Result};
pub use score::Score;
pub use service::{ATTEMPT_CREATE_SCOPE, AttemptService};
pub use status::AttemptStatus;
