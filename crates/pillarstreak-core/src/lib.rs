//! # Pillarstreak Core Library
//!
//! Daily habit-pillar streak engine. Each calendar day one of three wellness
//! pillars (nutrition, sleep, movement) is assigned, either by the user or
//! by a rotation strategy. Completing the assigned pillar extends a streak of
//! consecutive calendar days. Like the CLI built on top of it, every
//! operation here is usable without any GUI.
//!
//! ## Architecture
//!
//! - **Calendar**: calendar-day arithmetic with a configurable day boundary
//! - **Streak**: pure streak calculation and the completion update protocol
//! - **Rotation**: pluggable pillar-selection strategies and the daily
//!   rotation orchestrator that protects manual choices
//! - **Storage**: SQLite key/value persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`PillarEngine`]: controller producing a new [`PillarState`] and an
//!   [`Event`] per transition
//! - [`RotationOrchestrator`]: daily rotation protocol
//! - [`StreakCalculator`]: consecutive-day streak from history
//! - [`Database`]: state persistence
//! - [`Config`]: engine configuration management

pub mod calendar;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod model;
pub mod pillar;
pub mod rotation;
pub mod storage;
pub mod streak;
pub mod summary;
pub mod validator;

pub use calendar::{Calendar, Clock, FixedClock, SystemClock, Timestamp};
pub use engine::{PillarEngine, PillarState, StatusReport};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{Event, RejectionReason};
pub use history::{calendar_view, parse_history, retain_recent, CalendarDay, DayStatus};
pub use model::{
    DailyAssignment, EntryMetrics, HistoryEntry, PillarHistory, PillarStats, RotationCheckpoint,
    StreakState,
};
pub use pillar::{Pillar, Target, TargetKind};
pub use rotation::{
    get_rotation_strategy, rotate, RotationDecision, RotationOrchestrator, RotationOutcome,
    RotationRequest, StrategyFn, StrategyRegistry,
};
pub use storage::{Config, Database};
pub use streak::{
    apply_completion, calculate_current_streak, calculate_longest_streak, is_streak_active,
    CompletionOutcome, StreakCalculator, StreakUpdater,
};
pub use summary::{summarize_history, HistorySummary};
pub use validator::validate_completion;
