//! Ledger-owning side of the quiz attempt workflow.
//!
//! This crate provides:
//! - the assignment catalog and its eligibility rules
//! - the reservation ledger that counts consumed attempts per (assignment, user)
//! - `AssignmentService`, the facade the saga talks to

pub mod assignment;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod service;

pub use assignment::{Assignment, AssignmentCatalog, CreateAssignment};
pub use eligibility::{Eligibility, IneligibilityReason, evaluate};
pub use error::{AssignmentError, Result};
pub use ledger::{ReleaseOutcome, ReleaseSkipped, ReservationLedger, ReservationOutcome};
pub use service::{AssignmentService, DemoFlags};
