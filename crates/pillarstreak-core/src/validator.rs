//! Completion validation.

use crate::model::DailyAssignment;
use crate::pillar::Pillar;

/// Whether `attempted` may complete `assignment`.
///
/// The attempted name must be exactly one of the pillar names and equal the
/// assigned pillar. Whether the assignment is already completed is not
/// considered; blocking repeat completions is the caller's policy.
pub fn validate_completion(attempted: &str, assignment: Option<&DailyAssignment>) -> bool {
    let Some(assignment) = assignment else {
        return false;
    };
    match Pillar::parse(attempted) {
        Some(pillar) => pillar == assignment.pillar,
        None => {
            tracing::warn!(pillar = attempted, "invalid pillar in completion attempt");
            false
        }
    }
}
