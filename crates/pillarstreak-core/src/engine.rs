//! Controller tying the protocol pieces to a clock, a configuration and a
//! random source.
//!
//! The engine holds no pillar state of its own. Each operation takes the
//! current [`PillarState`] and returns the next one together with the
//! [`Event`] describing the transition; the caller decides where state
//! lives (the CLI keeps it in the SQLite kv store).

use chrono::NaiveDate;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::{parse_timestamp, Calendar, Clock, SystemClock, Timestamp};
use crate::error::ValidationError;
use crate::events::{Event, RejectionReason};
use crate::history::{calendar_view, parse_history, CalendarDay};
use crate::model::{DailyAssignment, PillarStats, RotationCheckpoint, StreakState};
use crate::pillar::Pillar;
use crate::rotation::{RotationOrchestrator, RotationRequest, StrategyRegistry};
use crate::storage::Config;
use crate::streak::{StreakCalculator, StreakUpdater};
use crate::summary::{summarize_history, HistorySummary};
use crate::validator::validate_completion;

/// Everything the engine reads and writes for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PillarState {
    pub daily_assignment: Option<DailyAssignment>,
    #[serde(default)]
    pub streak: StreakState,
    #[serde(default)]
    pub checkpoint: RotationCheckpoint,
    #[serde(default)]
    pub stats: PillarStats,
    #[serde(default)]
    pub total_xp: u64,
}

impl PillarState {
    /// Lenient import. Each section is validated on its own; a malformed
    /// section degrades to its default instead of failing the whole state.
    pub fn from_json(value: &Value) -> Self {
        let daily_assignment = match value.get("dailyAssignment") {
            None | Some(Value::Null) => None,
            Some(raw) => match DailyAssignment::from_json(raw) {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding invalid daily assignment");
                    None
                }
            },
        };

        let streak = value.get("streak").map(streak_from_json).unwrap_or_default();

        let checkpoint = RotationCheckpoint {
            last_rotation_check_date: value
                .get("checkpoint")
                .and_then(|c| c.get("lastRotationCheckDate"))
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        };

        Self {
            daily_assignment,
            streak,
            checkpoint,
            stats: value
                .get("stats")
                .map(PillarStats::from_json)
                .unwrap_or_default(),
            total_xp: value.get("totalXp").and_then(Value::as_u64).unwrap_or(0),
        }
    }
}

fn streak_from_json(value: &Value) -> StreakState {
    let count = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    StreakState {
        current_count: count("currentCount"),
        longest_count: count("longestCount"),
        last_completed_date: value
            .get("lastCompletedDate")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        pillar_history: value
            .get("pillarHistory")
            .map(parse_history)
            .unwrap_or_default(),
    }
}

/// Read-only view of a state at the engine's current instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub now: Timestamp,
    pub today: NaiveDate,
    pub assignment: Option<DailyAssignment>,
    pub target_met: bool,
    /// Streak recomputed from history at `now`, so a lapsed streak reads 0
    /// even if the stored counter has not been refreshed yet.
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_active: bool,
    pub total_xp: u64,
    pub rotation_due: bool,
}

pub struct PillarEngine {
    config: Config,
    orchestrator: RotationOrchestrator,
    updater: StreakUpdater,
    clock: Box<dyn Clock>,
    rng: Pcg64,
}

impl PillarEngine {
    /// Engine on the wall clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Box<dyn Clock>) -> Self {
        let calendar = config.calendar();
        let orchestrator = RotationOrchestrator::new(StrategyRegistry::builtin(), calendar);
        let updater = StreakUpdater::new(StreakCalculator::new(calendar))
            .with_reward(config.rewards.pillar_completed_xp);
        let rng = match config.rotation.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        Self {
            config,
            orchestrator,
            updater,
            clock,
            rng,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calendar(&self) -> &Calendar {
        self.orchestrator.calendar()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Periodic rotation check with the configured strategy.
    pub fn check_rotation(&mut self, state: &PillarState) -> (PillarState, Event) {
        let strategy = self.config.rotation.strategy.clone();
        let request = RotationRequest::automatic(
            &state.stats,
            &state.streak.pillar_history,
            state.daily_assignment.as_ref(),
            state.checkpoint,
        )
        .with_strategy(&strategy);
        self.run_rotation(state, &request)
    }

    /// User selection. An unrecognised name lets the strategy choose.
    pub fn select_pillar(&mut self, state: &PillarState, pillar: &str) -> (PillarState, Event) {
        let strategy = self.config.rotation.strategy.clone();
        let request = RotationRequest::manual(
            pillar,
            &state.stats,
            &state.streak.pillar_history,
            state.daily_assignment.as_ref(),
            state.checkpoint,
        )
        .with_strategy(&strategy);
        self.run_rotation(state, &request)
    }

    fn run_rotation(
        &mut self,
        state: &PillarState,
        request: &RotationRequest<'_>,
    ) -> (PillarState, Event) {
        let now = self.clock.now();
        let outcome = self.orchestrator.rotate(request, now, &mut self.rng);
        let pillar = outcome.assignment.pillar;

        let event = if outcome.decision.replaced_assignment() {
            Event::PillarRotated {
                pillar,
                manual: outcome.assignment.is_manually_set,
                decision: outcome.decision,
                at: now,
            }
        } else {
            Event::RotationSkipped {
                pillar,
                decision: outcome.decision,
                at: now,
            }
        };

        let next = PillarState {
            daily_assignment: Some(outcome.assignment),
            checkpoint: outcome.checkpoint,
            ..state.clone()
        };
        (next, event)
    }

    /// Record measured progress on today's assignment.
    ///
    /// # Errors
    ///
    /// Fails when there is no assignment to record against.
    pub fn record_progress(
        &self,
        state: &PillarState,
        progress: f64,
    ) -> Result<(PillarState, Event), ValidationError> {
        let assignment = state
            .daily_assignment
            .as_ref()
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "dailyAssignment".into(),
                message: "no pillar assigned".into(),
            })?;

        let updated = assignment.with_progress(progress);
        let event = Event::ProgressRecorded {
            pillar: updated.pillar,
            progress: updated.progress,
            target_met: updated.target_met(),
            at: self.clock.now(),
        };
        let next = PillarState {
            daily_assignment: Some(updated),
            ..state.clone()
        };
        Ok((next, event))
    }

    /// Complete today's pillar if `attempted` names it.
    ///
    /// A rejected attempt returns the state unchanged with a
    /// [`Event::CompletionRejected`].
    pub fn complete_pillar(&self, state: &PillarState, attempted: &str) -> (PillarState, Event) {
        let now = self.clock.now();
        let assignment = state.daily_assignment.as_ref();

        let rejection = match assignment {
            None => Some(RejectionReason::NoAssignment),
            Some(_) if !validate_completion(attempted, assignment) => {
                Some(RejectionReason::PillarMismatch)
            }
            Some(a) if a.completed => Some(RejectionReason::AlreadyCompleted),
            Some(_) => None,
        };
        if let Some(reason) = rejection {
            tracing::warn!(attempted, ?reason, "completion rejected");
            return (
                state.clone(),
                Event::CompletionRejected {
                    attempted: attempted.to_string(),
                    reason,
                    at: now,
                },
            );
        }

        match self
            .updater
            .apply(true, assignment, Some(&state.streak), now)
        {
            Some(outcome) => {
                let event = Event::PillarCompleted {
                    pillar: outcome.assignment.pillar,
                    current_streak: outcome.streak.current_count,
                    longest_streak: outcome.streak.longest_count,
                    xp_awarded: outcome.xp_awarded,
                    at: now,
                };
                let next = PillarState {
                    daily_assignment: Some(outcome.assignment),
                    streak: outcome.streak,
                    total_xp: state.total_xp + u64::from(outcome.xp_awarded),
                    ..state.clone()
                };
                (next, event)
            }
            // Unreachable with an assignment present; treat like a missing one.
            None => (
                state.clone(),
                Event::CompletionRejected {
                    attempted: attempted.to_string(),
                    reason: RejectionReason::NoAssignment,
                    at: now,
                },
            ),
        }
    }

    /// Replace one pillar's stat.
    pub fn set_stat(&self, state: &PillarState, pillar: Pillar, value: f64) -> PillarState {
        let mut next = state.clone();
        next.stats.set(pillar, value);
        next
    }

    pub fn status(&self, state: &PillarState) -> StatusReport {
        let now = self.clock.now();
        let calculator = StreakCalculator::new(*self.calendar());
        let today = self.calendar().day_of(now);
        let current_streak = calculator.current_streak(&state.streak.pillar_history, now);
        let rotation_due = match &state.daily_assignment {
            None => true,
            Some(a) => {
                !state.checkpoint.checked_on(today) && self.calendar().day_of(a.date) != today
            }
        };
        StatusReport {
            now,
            today,
            assignment: state.daily_assignment.clone(),
            target_met: state
                .daily_assignment
                .as_ref()
                .is_some_and(DailyAssignment::target_met),
            current_streak,
            longest_streak: state
                .streak
                .longest_count
                .max(calculator.longest_streak(&state.streak.pillar_history)),
            streak_active: calculator.is_active(state.streak.last_completed_date, now),
            total_xp: state.total_xp,
            rotation_due,
        }
    }

    /// The last `days` days of history for display.
    pub fn calendar_view(&self, state: &PillarState, days: u32) -> Vec<CalendarDay> {
        calendar_view(
            &state.streak.pillar_history,
            days,
            self.clock.now(),
            self.calendar(),
        )
    }

    pub fn summary(&self, state: &PillarState) -> HistorySummary {
        summarize_history(&state.streak.pillar_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::rotation::RotationDecision;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn at(day: u32, hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap()
    }

    fn engine_at(ts: Timestamp) -> PillarEngine {
        let mut config = Config::default();
        config.rotation.seed = Some(42);
        PillarEngine::with_clock(config, Box::new(FixedClock(ts)))
    }

    #[test]
    fn first_check_assigns_and_second_is_skipped() {
        let mut engine = engine_at(at(10, 8));
        let (state, event) = engine.check_rotation(&PillarState::default());
        assert!(matches!(
            event,
            Event::PillarRotated { pillar: Pillar::Nutrition, manual: false, .. }
        ));
        let (again, event) = engine.check_rotation(&state);
        assert_eq!(again, state);
        assert!(matches!(
            event,
            Event::RotationSkipped { decision: RotationDecision::AlreadyChecked, .. }
        ));
    }

    #[test]
    fn select_then_complete_awards_xp() {
        let engine_ts = at(10, 9);
        let mut engine = engine_at(engine_ts);
        let (state, _) = engine.select_pillar(&PillarState::default(), "sleep");
        let (state, event) = engine.complete_pillar(&state, "sleep");
        match event {
            Event::PillarCompleted { pillar, current_streak, xp_awarded, .. } => {
                assert_eq!(pillar, Pillar::Sleep);
                assert_eq!(current_streak, 1);
                assert_eq!(xp_awarded, 50);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(state.total_xp, 50);
        assert!(state.daily_assignment.as_ref().unwrap().completed);
        assert_eq!(state.streak.last_completed_date, Some(engine_ts));
    }

    #[test]
    fn completion_rejections() {
        let mut engine = engine_at(at(10, 9));
        let (_, event) = engine.complete_pillar(&PillarState::default(), "sleep");
        assert!(matches!(
            event,
            Event::CompletionRejected { reason: RejectionReason::NoAssignment, .. }
        ));

        let (state, _) = engine.select_pillar(&PillarState::default(), "sleep");
        let (unchanged, event) = engine.complete_pillar(&state, "movement");
        assert_eq!(unchanged, state);
        assert!(matches!(
            event,
            Event::CompletionRejected { reason: RejectionReason::PillarMismatch, .. }
        ));

        let (done, _) = engine.complete_pillar(&state, "sleep");
        let (again, event) = engine.complete_pillar(&done, "sleep");
        assert_eq!(again, done);
        assert!(matches!(
            event,
            Event::CompletionRejected { reason: RejectionReason::AlreadyCompleted, .. }
        ));
    }

    #[test]
    fn progress_clamps_and_reports_target() {
        let mut engine = engine_at(at(10, 9));
        assert!(engine.record_progress(&PillarState::default(), 1.0).is_err());

        let (state, _) = engine.select_pillar(&PillarState::default(), "movement");
        let (state, event) = engine.record_progress(&state, 45.0).unwrap();
        assert!(matches!(event, Event::ProgressRecorded { target_met: true, .. }));
        assert_eq!(state.daily_assignment.unwrap().progress, 45.0);
    }

    #[test]
    fn status_reflects_lapsed_streak() {
        let mut engine = engine_at(at(10, 9));
        let (state, _) = engine.select_pillar(&PillarState::default(), "nutrition");
        let (state, _) = engine.complete_pillar(&state, "nutrition");

        let later = engine_at(at(10, 9) + Duration::days(3));
        let report = later.status(&state);
        assert_eq!(report.current_streak, 0);
        assert_eq!(report.longest_streak, 1);
        assert!(!report.streak_active);
        assert!(report.rotation_due);
        assert_eq!(report.total_xp, 50);
    }

    #[test]
    fn seeded_weighted_random_is_reproducible() {
        let mut config = Config::default();
        config.rotation.strategy = "weighted-random".into();
        config.rotation.seed = Some(7);
        let state = PillarState {
            stats: PillarStats::new()
                .with(Pillar::Nutrition, 20.0)
                .with(Pillar::Sleep, 50.0)
                .with(Pillar::Movement, 80.0),
            ..PillarState::default()
        };
        let pick = |config: Config| {
            let mut engine = PillarEngine::with_clock(config, Box::new(FixedClock(at(10, 9))));
            let (next, _) = engine.check_rotation(&state);
            next.daily_assignment.unwrap().pillar
        };
        assert_eq!(pick(config.clone()), pick(config));
    }

    #[test]
    fn state_from_json_degrades_per_section() {
        let raw = json!({
            "dailyAssignment": { "pillar": "yoga", "date": "2024-09-10T08:00:00Z" },
            "streak": {
                "currentCount": 2,
                "lastCompletedDate": "not a date",
                "pillarHistory": [
                    { "date": "2024-09-09T08:00:00Z", "pillar": "sleep", "completed": true },
                    { "date": "garbage", "pillar": "sleep", "completed": true }
                ]
            },
            "checkpoint": { "lastRotationCheckDate": "2024-09-09" },
            "stats": { "sleep": 40, "yoga": 10 },
            "totalXp": 150
        });
        let state = PillarState::from_json(&raw);
        assert!(state.daily_assignment.is_none());
        assert_eq!(state.streak.current_count, 2);
        assert_eq!(state.streak.last_completed_date, None);
        assert_eq!(state.streak.pillar_history.len(), 1);
        assert_eq!(
            state.checkpoint,
            RotationCheckpoint::at(NaiveDate::from_ymd_opt(2024, 9, 9).unwrap())
        );
        assert_eq!(state.stats.get(Pillar::Sleep), 40.0);
        assert_eq!(state.total_xp, 150);
    }

    #[test]
    fn state_json_roundtrip_through_lenient_import() {
        let mut engine = engine_at(at(10, 9));
        let (state, _) = engine.select_pillar(&PillarState::default(), "sleep");
        let (state, _) = engine.complete_pillar(&state, "sleep");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(PillarState::from_json(&value), state);
    }
}
