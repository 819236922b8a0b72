//! Eligibility rules for reserving an attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assignment::Assignment;

/// Why a user may not reserve an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IneligibilityReason {
    /// The assignment does not exist.
    NotFound,

    /// The assignment window has not opened yet.
    NotYetOpen,

    /// The assignment window has closed.
    Closed,

    /// Every allowed attempt has been used.
    MaxAttemptsReached,
}

impl IneligibilityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IneligibilityReason::NotFound => "not found",
            IneligibilityReason::NotYetOpen => "not yet open",
            IneligibilityReason::Closed => "closed",
            IneligibilityReason::MaxAttemptsReached => "max attempts reached",
        }
    }
}

impl std::fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an eligibility evaluation.
///
/// Only valid at the instant it was computed: the counter may move before
/// the caller acts on it, which is why the ledger re-evaluates on reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    Eligible,
    Ineligible(IneligibilityReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    /// Human-readable reason, `"eligible"` when allowed.
    pub fn reason(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::Ineligible(reason) => reason.as_str(),
        }
    }
}

/// Decides whether a user with `used` consumed attempts may reserve another.
///
/// Checks run in order and the first failing one wins: existence, window
/// opening, window closing, quota. A missing counter row means `used == 0`.
/// Both window bounds are inclusive.
pub fn evaluate(assignment: Option<&Assignment>, used: u32, now: DateTime<Utc>) -> Eligibility {
    let Some(assignment) = assignment else {
        return Eligibility::Ineligible(IneligibilityReason::NotFound);
    };

    if let Some(open_at) = assignment.open_at
        && now < open_at
    {
        return Eligibility::Ineligible(IneligibilityReason::NotYetOpen);
    }

    if let Some(close_at) = assignment.close_at
        && now > close_at
    {
        return Eligibility::Ineligible(IneligibilityReason::Closed);
    }

    if used >= assignment.max_attempts {
        return Eligibility::Ineligible(IneligibilityReason::MaxAttemptsReached);
    }

    Eligibility::Eligible
}
