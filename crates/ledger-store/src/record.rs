use common::{AssignmentId, UserId};
use serde::{Deserialize, Serialize};

/// Number of attempts a user has consumed on an assignment.
///
/// Rows are created lazily by the first successful reservation, so a missing
/// row means `used == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounter {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub used: u32,
}

impl AttemptCounter {
    /// A counter for a pair that has never reserved anything.
    pub fn empty(assignment_id: AssignmentId, user_id: UserId) -> Self {
        Self {
            assignment_id,
            user_id,
            used: 0,
        }
    }
}
