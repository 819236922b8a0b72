//! Attempt state machine.

use serde::{Deserialize, Serialize};

/// The status of an attempt in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Submitted
///           │
///           └──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// Attempt is open, answers may be submitted and scored.
    #[default]
    Pending,

    /// Attempt was finalized with a score (terminal state).
    Submitted,

    /// Attempt was cancelled (terminal state).
    Canceled,
}

impl AttemptStatus {
    /// Returns true if answers can be upserted in this status.
    pub fn can_submit_answers(&self) -> bool {
        matches!(self, AttemptStatus::Pending)
    }

    /// Returns true if the attempt can be scored in this status.
    pub fn can_score(&self) -> bool {
        matches!(self, AttemptStatus::Pending)
    }

    /// Returns true if the attempt can be finalized in this status.
    pub fn can_finalize(&self) -> bool {
        matches!(self, AttemptStatus::Pending)
    }

    /// Returns true if the attempt can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, AttemptStatus::Pending)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Submitted | AttemptStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Pending => "PENDING",
            AttemptStatus::Submitted => "SUBMITTED",
            AttemptStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AttemptStatus; 3] = [
        AttemptStatus::Pending,
        AttemptStatus::Submitted,
        AttemptStatus::Canceled,
    ];

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(AttemptStatus::default(), AttemptStatus::Pending);
    }

    #[test]
    fn test_only_pending_allows_transitions() {
        for status in ALL {
            let pending = status == AttemptStatus::Pending;
            assert_eq!(status.can_submit_answers(), pending);
            assert_eq!(status.can_score(), pending);
            assert_eq!(status.can_finalize(), pending);
            assert_eq!(status.can_cancel(), pending);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AttemptStatus::Pending.is_terminal());
        assert!(AttemptStatus::Submitted.is_terminal());
        assert!(AttemptStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&AttemptStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
        let parsed: AttemptStatus = serde_json::from_str("\"SUBMITTED\"").unwrap();
        assert_eq!(parsed, AttemptStatus::Submitted);
    }

    #[test]
    fn test_display() {
        assert_eq!(AttemptStatus::Pending.to_string(), "PENDING");
    }
}
