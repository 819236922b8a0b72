//! Identifier types shared by the assignment, attempt and saga crates.

pub mod types;

pub use types::{AssignmentId, AttemptId, IdempotencyKey, UserId};
