use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pillar::Pillar;
use crate::rotation::RotationDecision;

/// Every state transition of the engine produces an Event.
/// The CLI prints them; a GUI would poll for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A fresh daily assignment replaced the previous one.
    PillarRotated {
        pillar: Pillar,
        manual: bool,
        decision: RotationDecision,
        at: DateTime<Utc>,
    },
    /// A rotation check ran and kept the current assignment.
    RotationSkipped {
        pillar: Pillar,
        decision: RotationDecision,
        at: DateTime<Utc>,
    },
    ProgressRecorded {
        pillar: Pillar,
        progress: f64,
        target_met: bool,
        at: DateTime<Utc>,
    },
    PillarCompleted {
        pillar: Pillar,
        current_streak: u32,
        longest_streak: u32,
        xp_awarded: u32,
        at: DateTime<Utc>,
    },
    CompletionRejected {
        attempted: String,
        reason: RejectionReason,
        at: DateTime<Utc>,
    },
}

/// Why a completion attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NoAssignment,
    PillarMismatch,
    AlreadyCompleted,
}
