mod calculator;
mod update;

pub use calculator::{
    calculate_current_streak, calculate_longest_streak, is_streak_active, StreakCalculator,
    ACTIVE_WINDOW_MS,
};
pub use update::{apply_completion, CompletionOutcome, StreakUpdater, PILLAR_COMPLETED_XP};
