//! Daily rotation protocol.
//!
//! Decides, for a manual or automatic trigger, whether a new daily
//! assignment is produced. Rules, in priority order:
//!
//! ```text
//! manual                                   -> new manual assignment
//! auto, checkpoint == today                -> no-op
//! auto, current is manual and dated today  -> keep, checkpoint := today
//! auto, current dated today                -> keep, checkpoint := today
//! auto, otherwise                          -> new automatic assignment
//! ```
//!
//! Every path that returns leaves the checkpoint at today, so the second
//! rule absorbs any number of repeated automatic triggers on the same day.
//! A manual trigger skips every check and always replaces the assignment.
//! Strategies that read stats fall back to round-robin when a stat is not
//! finite; round-robin itself ignores stats and always runs.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::strategy::{round_robin, StrategyRegistry, ROUND_ROBIN};
use crate::calendar::{Calendar, Timestamp};
use crate::model::{DailyAssignment, HistoryEntry, PillarStats, RotationCheckpoint};
use crate::pillar::Pillar;

/// Inputs to one rotation check.
#[derive(Debug, Clone, Copy)]
pub struct RotationRequest<'a> {
    /// Explicit user selection rather than a periodic check.
    pub manual: bool,
    /// Pillar the user picked. Ignored for automatic checks; when absent or
    /// invalid on a manual request the strategy decides instead.
    pub selected_pillar: Option<&'a str>,
    pub strategy: &'a str,
    pub stats: &'a PillarStats,
    pub history: &'a [HistoryEntry],
    pub current: Option<&'a DailyAssignment>,
    pub checkpoint: RotationCheckpoint,
}

impl<'a> RotationRequest<'a> {
    /// Periodic check with the round-robin strategy and no stats.
    pub fn automatic(
        stats: &'a PillarStats,
        history: &'a [HistoryEntry],
        current: Option<&'a DailyAssignment>,
        checkpoint: RotationCheckpoint,
    ) -> Self {
        Self {
            manual: false,
            selected_pillar: None,
            strategy: ROUND_ROBIN,
            stats,
            history,
            current,
            checkpoint,
        }
    }

    /// User selection of `pillar`.
    pub fn manual(
        pillar: &'a str,
        stats: &'a PillarStats,
        history: &'a [HistoryEntry],
        current: Option<&'a DailyAssignment>,
        checkpoint: RotationCheckpoint,
    ) -> Self {
        Self {
            manual: true,
            selected_pillar: Some(pillar),
            ..Self::automatic(stats, history, current, checkpoint)
        }
    }

    pub fn with_strategy(mut self, strategy: &'a str) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Which rule produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDecision {
    /// Manual trigger with a valid pillar.
    ManualSelection,
    /// Manual trigger without a usable pillar; the strategy chose.
    ManualStrategyFallback,
    /// Automatic trigger after today's check already ran.
    AlreadyChecked,
    /// Automatic trigger while today's assignment was set manually.
    ManualProtected,
    /// Automatic trigger while today's assignment already exists.
    AlreadyAssigned,
    /// Automatic trigger on a new day, or with no assignment yet.
    Rotated,
    /// Automatic trigger whose strategy could not use the stats; round-robin
    /// chose instead.
    SafeDefault,
}

impl RotationDecision {
    /// Whether a fresh assignment was produced.
    pub fn replaced_assignment(&self) -> bool {
        matches!(
            self,
            RotationDecision::ManualSelection
                | RotationDecision::ManualStrategyFallback
                | RotationDecision::Rotated
                | RotationDecision::SafeDefault
        )
    }
}

/// Result of a rotation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationOutcome {
    pub assignment: DailyAssignment,
    pub checkpoint: RotationCheckpoint,
    pub decision: RotationDecision,
}

/// Runs the rotation protocol against an injected strategy registry.
#[derive(Debug, Clone, Default)]
pub struct RotationOrchestrator {
    registry: StrategyRegistry,
    calendar: Calendar,
}

impl RotationOrchestrator {
    pub fn new(registry: StrategyRegistry, calendar: Calendar) -> Self {
        Self { registry, calendar }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Apply the rotation rules at `now`.
    pub fn rotate(
        &self,
        request: &RotationRequest<'_>,
        now: Timestamp,
        rng: &mut dyn RngCore,
    ) -> RotationOutcome {
        let today = self.calendar.day_of(now);
        let checkpoint = RotationCheckpoint::at(today);

        if request.manual {
            let outcome = match request.selected_pillar.and_then(Pillar::parse) {
                Some(pillar) => RotationOutcome {
                    assignment: DailyAssignment::new(pillar, now, true),
                    checkpoint,
                    decision: RotationDecision::ManualSelection,
                },
                None => {
                    if let Some(raw) = request.selected_pillar {
                        tracing::warn!(pillar = raw, "invalid manual pillar, using strategy");
                    }
                    let (pillar, _) = self.select(request, rng);
                    RotationOutcome {
                        assignment: DailyAssignment::new(pillar, now, true),
                        checkpoint,
                        decision: RotationDecision::ManualStrategyFallback,
                    }
                }
            };
            return self.log(outcome);
        }

        if let Some(current) = request.current {
            if request.checkpoint.checked_on(today) {
                return self.log(RotationOutcome {
                    assignment: current.clone(),
                    checkpoint: request.checkpoint,
                    decision: RotationDecision::AlreadyChecked,
                });
            }

            if self.calendar.day_of(current.date) == today {
                let decision = if current.is_manually_set {
                    RotationDecision::ManualProtected
                } else {
                    RotationDecision::AlreadyAssigned
                };
                return self.log(RotationOutcome {
                    assignment: current.clone(),
                    checkpoint,
                    decision,
                });
            }
        }

        let (pillar, degraded) = self.select(request, rng);
        self.log(RotationOutcome {
            assignment: DailyAssignment::new(pillar, now, false),
            checkpoint,
            decision: if degraded {
                RotationDecision::SafeDefault
            } else {
                RotationDecision::Rotated
            },
        })
    }

    /// Run the requested strategy. Stats-reading strategies given
    /// non-finite stats are replaced by round-robin; the flag reports that.
    fn select(&self, request: &RotationRequest<'_>, rng: &mut dyn RngCore) -> (Pillar, bool) {
        let reads_stats =
            request.strategy != ROUND_ROBIN && self.registry.contains(request.strategy);
        if reads_stats && !request.stats.is_well_formed() {
            tracing::warn!(
                strategy = request.strategy,
                stats = ?request.stats,
                "non-finite pillar stats, using round-robin"
            );
            return (round_robin(request.stats, request.history, rng), true);
        }
        let strategy = self.registry.get(request.strategy);
        (strategy(request.stats, request.history, rng), false)
    }

    fn log(&self, outcome: RotationOutcome) -> RotationOutcome {
        tracing::debug!(
            decision = ?outcome.decision,
            pillar = %outcome.assignment.pillar,
            manual = outcome.assignment.is_manually_set,
            "rotation check"
        );
        outcome
    }
}

/// Rotation with the built-in strategies, UTC day boundaries and a
/// thread-local random source.
pub fn rotate(request: &RotationRequest<'_>, now: Timestamp) -> RotationOutcome {
    RotationOrchestrator::default().rotate(request, now, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::strategy::{STATS_BASED, WEIGHTED_RANDOM};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 9, 12, 10, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 12).unwrap()
    }

    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(7)
    }

    fn orchestrator() -> RotationOrchestrator {
        RotationOrchestrator::default()
    }

    #[test]
    fn test_manual_selection_wins() {
        let stats = PillarStats::new();
        let req = RotationRequest::manual("sleep", &stats, &[], None, RotationCheckpoint::default());
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_eq!(out.assignment.pillar, Pillar::Sleep);
        assert!(out.assignment.is_manually_set);
        assert_eq!(out.assignment.progress, 0.0);
        assert!(!out.assignment.completed);
        assert_eq!(out.assignment.target, Pillar::Sleep.target());
        assert_eq!(out.assignment.date, now());
        assert_eq!(out.checkpoint, RotationCheckpoint::at(today()));
        assert_eq!(out.decision, RotationDecision::ManualSelection);
    }

    #[test]
    fn test_manual_ignores_checkpoint_and_existing_assignment() {
        let stats = PillarStats::new();
        let existing = DailyAssignment::new(Pillar::Nutrition, now(), true);
        let req = RotationRequest::manual(
            "movement",
            &stats,
            &[],
            Some(&existing),
            RotationCheckpoint::at(today()),
        );
        let out = orchestrator().rotate(&req, now() + Duration::minutes(5), &mut rng());
        assert_eq!(out.assignment.pillar, Pillar::Movement);
        assert_ne!(out.assignment.id, existing.id);
    }

    #[test]
    fn test_manual_same_pillar_still_replaces() {
        let stats = PillarStats::new();
        let existing = DailyAssignment::new(Pillar::Sleep, now(), true).with_progress(4.0);
        let req = RotationRequest::manual("sleep", &stats, &[], Some(&existing), RotationCheckpoint::at(today()));
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_ne!(out.assignment.id, existing.id);
        assert_eq!(out.assignment.progress, 0.0);
    }

    #[test]
    fn test_manual_invalid_pillar_uses_strategy() {
        let stats = PillarStats::new();
        for bad in ["invalid-pillar", "", "SLEEP"] {
            let req = RotationRequest::manual(bad, &stats, &[], None, RotationCheckpoint::default());
            let out = orchestrator().rotate(&req, now(), &mut rng());
            assert_eq!(out.assignment.pillar, Pillar::Nutrition);
            assert!(out.assignment.is_manually_set);
            assert_eq!(out.decision, RotationDecision::ManualStrategyFallback);
        }
    }

    #[test]
    fn test_manual_without_selection_uses_strategy() {
        let stats = PillarStats::new()
            .with(Pillar::Nutrition, 80.0)
            .with(Pillar::Sleep, 30.0)
            .with(Pillar::Movement, 70.0);
        let req = RotationRequest {
            manual: true,
            selected_pillar: None,
            strategy: STATS_BASED,
            stats: &stats,
            history: &[],
            current: None,
            checkpoint: RotationCheckpoint::default(),
        };
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_eq!(out.assignment.pillar, Pillar::Sleep);
        assert!(out.assignment.is_manually_set);
    }

    #[test]
    fn test_first_automatic_rotation() {
        let stats = PillarStats::new();
        let req = RotationRequest::automatic(&stats, &[], None, RotationCheckpoint::default());
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_eq!(out.assignment.pillar, Pillar::Nutrition);
        assert!(!out.assignment.is_manually_set);
        assert_eq!(out.decision, RotationDecision::Rotated);
        assert_eq!(out.checkpoint, RotationCheckpoint::at(today()));
    }

    #[test]
    fn test_automatic_is_idempotent_within_a_day() {
        let stats = PillarStats::new();
        let o = orchestrator();
        let first = o.rotate(
            &RotationRequest::automatic(&stats, &[], None, RotationCheckpoint::default()),
            now(),
            &mut rng(),
        );
        let mut current = first.clone();
        for minutes in 1..20 {
            current = o.rotate(
                &RotationRequest::automatic(&stats, &[], Some(&current.assignment), current.checkpoint),
                now() + Duration::minutes(minutes),
                &mut rng(),
            );
            assert_eq!(current.decision, RotationDecision::AlreadyChecked);
        }
        assert_eq!(current.assignment, first.assignment);
        assert_eq!(current.checkpoint, first.checkpoint);
    }

    #[test]
    fn test_automatic_never_overrides_same_day_manual() {
        let stats = PillarStats::new();
        let o = orchestrator();
        let manual = o.rotate(
            &RotationRequest::manual("movement", &stats, &[], None, RotationCheckpoint::default()),
            now(),
            &mut rng(),
        );
        let auto = o.rotate(
            &RotationRequest::automatic(&stats, &[], Some(&manual.assignment), manual.checkpoint),
            now() + Duration::hours(1),
            &mut rng(),
        );
        assert_eq!(auto.assignment, manual.assignment);
        assert_eq!(auto.assignment.pillar, Pillar::Movement);
        assert!(auto.assignment.is_manually_set);
    }

    #[test]
    fn test_manual_protected_even_with_stale_checkpoint() {
        let stats = PillarStats::new();
        let manual = DailyAssignment::new(Pillar::Movement, now(), true);
        let stale = RotationCheckpoint::at(today().pred_opt().unwrap());
        let out = orchestrator().rotate(
            &RotationRequest::automatic(&stats, &[], Some(&manual), stale),
            now() + Duration::hours(2),
            &mut rng(),
        );
        assert_eq!(out.decision, RotationDecision::ManualProtected);
        assert_eq!(out.assignment, manual);
        assert_eq!(out.checkpoint, RotationCheckpoint::at(today()));
    }

    #[test]
    fn test_same_day_automatic_assignment_kept_and_checkpoint_advanced() {
        let stats = PillarStats::new();
        let existing = DailyAssignment::new(Pillar::Sleep, now() - Duration::hours(3), false);
        let out = orchestrator().rotate(
            &RotationRequest::automatic(&stats, &[], Some(&existing), RotationCheckpoint::default()),
            now(),
            &mut rng(),
        );
        assert_eq!(out.decision, RotationDecision::AlreadyAssigned);
        assert_eq!(out.assignment, existing);
        assert_eq!(out.checkpoint, RotationCheckpoint::at(today()));
    }

    #[test]
    fn test_new_day_rotates_past_yesterdays_manual() {
        let stats = PillarStats::new();
        let yesterday = DailyAssignment::new(Pillar::Movement, now() - Duration::days(1), true);
        let checkpoint = RotationCheckpoint::at(today().pred_opt().unwrap());
        let history = vec![HistoryEntry::from_assignment(&yesterday, true)];
        let out = orchestrator().rotate(
            &RotationRequest::automatic(&stats, &history, Some(&yesterday), checkpoint),
            now(),
            &mut rng(),
        );
        assert_eq!(out.decision, RotationDecision::Rotated);
        assert_eq!(out.assignment.pillar, Pillar::Nutrition);
        assert!(!out.assignment.is_manually_set);
        assert_ne!(out.assignment.id, yesterday.id);
    }

    #[test]
    fn test_checkpoint_today_without_assignment_still_produces_one() {
        let stats = PillarStats::new();
        let out = orchestrator().rotate(
            &RotationRequest::automatic(&stats, &[], None, RotationCheckpoint::at(today())),
            now(),
            &mut rng(),
        );
        assert_eq!(out.decision, RotationDecision::Rotated);
        assert_eq!(out.assignment.pillar, Pillar::Nutrition);
    }

    #[test]
    fn test_non_finite_stats_make_stats_strategies_use_round_robin() {
        let stats = PillarStats::new().with(Pillar::Nutrition, 10.0).with(Pillar::Sleep, f64::INFINITY);
        let history = vec![HistoryEntry::from_assignment(
            &DailyAssignment::new(Pillar::Nutrition, now() - Duration::days(1), false),
            true,
        )];
        for strategy in [WEIGHTED_RANDOM, STATS_BASED] {
            let req = RotationRequest::automatic(&stats, &history, None, RotationCheckpoint::default())
                .with_strategy(strategy);
            let out = orchestrator().rotate(&req, now(), &mut rng());
            assert_eq!(out.decision, RotationDecision::SafeDefault);
            assert_eq!(out.assignment.pillar, Pillar::Sleep);
            assert!(!out.assignment.is_manually_set);
            assert_eq!(out.checkpoint, RotationCheckpoint::at(today()));
        }
    }

    #[test]
    fn test_round_robin_keeps_cycling_with_infinite_stat() {
        let stats = PillarStats::new().with(Pillar::Sleep, f64::INFINITY);
        let o = orchestrator();
        let mut history: Vec<HistoryEntry> = Vec::new();
        let mut current: Option<DailyAssignment> = None;
        let mut checkpoint = RotationCheckpoint::default();
        let mut picks = Vec::new();

        for day in 0..3 {
            let req = RotationRequest::automatic(&stats, &history, current.as_ref(), checkpoint);
            let out = o.rotate(&req, now() + Duration::days(day), &mut rng());
            assert_eq!(out.decision, RotationDecision::Rotated);
            picks.push(out.assignment.pillar);
            history.push(HistoryEntry::from_assignment(&out.assignment, true));
            current = Some(out.assignment);
            checkpoint = out.checkpoint;
        }
        assert_eq!(picks, vec![Pillar::Nutrition, Pillar::Sleep, Pillar::Movement]);
    }

    #[test]
    fn test_manual_fallback_with_infinite_stat_stays_manual() {
        let stats = PillarStats::new().with(Pillar::Movement, f64::NEG_INFINITY);
        let req = RotationRequest::manual("yoga", &stats, &[], None, RotationCheckpoint::default())
            .with_strategy(STATS_BASED);
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_eq!(out.decision, RotationDecision::ManualStrategyFallback);
        assert!(out.assignment.is_manually_set);
        assert_eq!(out.assignment.pillar, Pillar::Nutrition);
    }

    #[test]
    fn test_unknown_strategy_name_uses_round_robin() {
        let stats = PillarStats::new().with(Pillar::Nutrition, 0.0);
        let history = vec![HistoryEntry::from_assignment(
            &DailyAssignment::new(Pillar::Sleep, now() - Duration::days(1), false),
            true,
        )];
        let req = RotationRequest::automatic(&stats, &history, None, RotationCheckpoint::default())
            .with_strategy("Stats-Based");
        let out = orchestrator().rotate(&req, now(), &mut rng());
        assert_eq!(out.assignment.pillar, Pillar::Movement);
    }

    #[test]
    fn test_free_rotate_uses_builtin_registry() {
        let stats = PillarStats::new();
        let out = rotate(
            &RotationRequest::manual("nutrition", &stats, &[], None, RotationCheckpoint::default()),
            now(),
        );
        assert_eq!(out.assignment.pillar, Pillar::Nutrition);
        assert!(out.decision.replaced_assignment());
        assert!(!RotationDecision::AlreadyChecked.replaced_assignment());
    }
}
