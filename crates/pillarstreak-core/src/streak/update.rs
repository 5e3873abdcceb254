//! Applying a completion to the streak state.

use serde::{Deserialize, Serialize};

use super::calculator::StreakCalculator;
use crate::calendar::Timestamp;
use crate::model::{DailyAssignment, HistoryEntry, StreakState};

/// Experience granted for completing the daily pillar.
pub const PILLAR_COMPLETED_XP: u32 = 50;

/// Result of [`StreakUpdater::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub assignment: DailyAssignment,
    pub streak: StreakState,
    pub xp_awarded: u32,
}

/// Records completions into history and keeps the derived counters in sync.
#[derive(Debug, Clone, Copy)]
pub struct StreakUpdater {
    calculator: StreakCalculator,
    reward_xp: u32,
}

impl Default for StreakUpdater {
    fn default() -> Self {
        Self::new(StreakCalculator::default())
    }
}

impl StreakUpdater {
    pub fn new(calculator: StreakCalculator) -> Self {
        Self {
            calculator,
            reward_xp: PILLAR_COMPLETED_XP,
        }
    }

    /// Override the per-completion reward.
    pub fn with_reward(mut self, reward_xp: u32) -> Self {
        self.reward_xp = reward_xp;
        self
    }

    /// Apply a completion report for `assignment`.
    ///
    /// Returns `None` when either input is missing. A positive report appends
    /// one history entry and awards the reward; a negative report leaves the
    /// history untouched and only re-derives the streak from it.
    pub fn apply(
        &self,
        completed: bool,
        assignment: Option<&DailyAssignment>,
        streak: Option<&StreakState>,
        now: Timestamp,
    ) -> Option<CompletionOutcome> {
        let (assignment, streak) = match (assignment, streak) {
            (Some(a), Some(s)) => (a, s),
            _ => {
                tracing::warn!(
                    has_assignment = assignment.is_some(),
                    has_streak = streak.is_some(),
                    "completion ignored: missing state"
                );
                return None;
            }
        };

        if !completed {
            let current_count = self.calculator.current_streak(&streak.pillar_history, now);
            return Some(CompletionOutcome {
                assignment: assignment.clone(),
                streak: StreakState {
                    current_count,
                    longest_count: streak.longest_count.max(current_count),
                    ..streak.clone()
                },
                xp_awarded: 0,
            });
        }

        let mut pillar_history = streak.pillar_history.clone();
        pillar_history.push(HistoryEntry::from_assignment(assignment, true));

        let current_count = self.calculator.current_streak(&pillar_history, now);
        let longest_count = streak.longest_count.max(current_count);

        tracing::debug!(
            pillar = %assignment.pillar,
            current_count,
            longest_count,
            "pillar completed"
        );

        Some(CompletionOutcome {
            assignment: DailyAssignment {
                completed: true,
                ..assignment.clone()
            },
            streak: StreakState {
                current_count,
                longest_count,
                last_completed_date: Some(now),
                pillar_history,
            },
            xp_awarded: self.reward_xp,
        })
    }
}

/// [`StreakUpdater::apply`] with UTC day boundaries and the default reward.
pub fn apply_completion(
    completed: bool,
    assignment: Option<&DailyAssignment>,
    streak: Option<&StreakState>,
    now: Timestamp,
) -> Option<CompletionOutcome> {
    StreakUpdater::default().apply(completed, assignment, streak, now)
}
