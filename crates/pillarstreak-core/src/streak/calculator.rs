//! Calendar-day streak arithmetic.
//!
//! A streak is the run of consecutive calendar days with at least one
//! completed entry, ending today or yesterday. Several completions on the
//! same day count once; incomplete entries never count.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::calendar::{parse_timestamp, Calendar, Timestamp};
use crate::model::HistoryEntry;

/// Activity-freshness window: a streak is "active" while the last completion
/// is at most this many milliseconds old.
pub const ACTIVE_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Derives streak values from pillar history.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakCalculator {
    calendar: Calendar,
}

impl StreakCalculator {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Current streak as of `now`.
    ///
    /// Walks distinct completed days from the most recent backwards with an
    /// anchor starting at today; the first gap of more than one calendar day
    /// ends the run.
    pub fn current_streak(&self, history: &[HistoryEntry], now: Timestamp) -> u32 {
        let days = self.completed_days(history);
        let mut anchor = self.calendar.day_of(now);
        let mut streak = 0u32;

        for day in days.iter().rev() {
            if Calendar::days_between_dates(*day, anchor) > 1 {
                break;
            }
            streak += 1;
            anchor = *day;
        }

        tracing::trace!(streak, distinct_days = days.len(), "computed current streak");
        streak
    }

    /// Longest run of consecutive completed days anywhere in the history.
    pub fn longest_streak(&self, history: &[HistoryEntry]) -> u32 {
        let days = self.completed_days(history);
        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<NaiveDate> = None;

        for day in days {
            run = match prev {
                Some(p) if p.succ_opt() == Some(day) => run + 1,
                _ => 1,
            };
            best = best.max(run);
            prev = Some(day);
        }
        best
    }

    /// Whether the last completion is within [`ACTIVE_WINDOW_MS`] of `now`,
    /// inclusive. Completions dated in the future count as active.
    pub fn is_active(&self, last_completed: Option<Timestamp>, now: Timestamp) -> bool {
        match last_completed {
            Some(last) => (now - last).num_milliseconds() <= ACTIVE_WINDOW_MS,
            None => false,
        }
    }

    /// Distinct calendar days with at least one completed entry, ascending.
    fn completed_days(&self, history: &[HistoryEntry]) -> BTreeSet<NaiveDate> {
        history
            .iter()
            .filter(|e| e.completed)
            .map(|e| self.calendar.day_of(e.date))
            .collect()
    }
}

/// Current streak using UTC day boundaries.
pub fn calculate_current_streak(history: Option<&[HistoryEntry]>, now: Timestamp) -> u32 {
    match history {
        Some(h) => StreakCalculator::default().current_streak(h, now),
        None => 0,
    }
}

/// Longest run of consecutive completed days using UTC day boundaries.
pub fn calculate_longest_streak(history: &[HistoryEntry]) -> u32 {
    StreakCalculator::default().longest_streak(history)
}

/// Freshness check over a raw persisted timestamp.
///
/// Missing, empty and unparseable values are inactive.
pub fn is_streak_active(last_completed: Option<&str>, now: Timestamp) -> bool {
    let Some(raw) = last_completed.filter(|s| !s.is_empty()) else {
        return false;
    };
    match parse_timestamp(raw) {
        Some(last) => StreakCalculator::default().is_active(Some(last), now),
        None => {
            tracing::warn!(value = raw, "invalid lastCompletedDate");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryMetrics;
    use crate::pillar::Pillar;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(date: Timestamp, completed: bool) -> HistoryEntry {
        HistoryEntry {
            date,
            pillar: Pillar::Nutrition,
            completed,
            metrics: EntryMetrics {
                progress: 0.0,
                target: Pillar::Nutrition.target(),
            },
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 20, 15, 0, 0).unwrap()
    }

    fn days_ago(n: i64) -> Timestamp {
        now() - Duration::days(n)
    }

    #[test]
    fn test_empty_history() {
        let calc = StreakCalculator::default();
        assert_eq!(calc.current_streak(&[], now()), 0);
        assert_eq!(calculate_current_streak(None, now()), 0);
        assert_eq!(calculate_current_streak(Some(&[]), now()), 0);
    }

    #[test]
    fn test_consecutive_days_ending_today() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(2), true), entry(days_ago(1), true), entry(now(), true)];
        assert_eq!(calc.current_streak(&history, now()), 3);
    }

    #[test]
    fn test_run_ending_yesterday_still_counts() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(2), true), entry(days_ago(1), true)];
        assert_eq!(calc.current_streak(&history, now()), 2);
    }

    #[test]
    fn test_run_ending_two_days_ago_is_broken() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(3), true), entry(days_ago(2), true)];
        assert_eq!(calc.current_streak(&history, now()), 0);
    }

    #[test]
    fn test_gap_keeps_only_trailing_run() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(3), true), entry(now(), true)];
        assert_eq!(calc.current_streak(&history, now()), 1);
    }

    #[test]
    fn test_incomplete_day_breaks_streak() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(2), true), entry(days_ago(1), false), entry(now(), true)];
        assert_eq!(calc.current_streak(&history, now()), 1);
    }

    #[test]
    fn test_all_incomplete_is_zero() {
        let calc = StreakCalculator::default();
        let history = vec![entry(days_ago(1), false), entry(now(), false)];
        assert_eq!(calc.current_streak(&history, now()), 0);
    }

    #[test]
    fn test_same_day_counts_once() {
        let calc = StreakCalculator::default();
        let history = vec![
            entry(now() - Duration::hours(5), true),
            entry(now() - Duration::hours(1), true),
            entry(now(), true),
        ];
        assert_eq!(calc.current_streak(&history, now()), 1);
    }

    #[test]
    fn test_unsorted_history() {
        let calc = StreakCalculator::default();
        let history = vec![entry(now(), true), entry(days_ago(2), true), entry(days_ago(1), true)];
        assert_eq!(calc.current_streak(&history, now()), 3);
    }

    #[test]
    fn test_calendar_days_not_24h_periods() {
        let calc = StreakCalculator::default();
        let today_8am = Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap();
        let yesterday_11pm = Utc.with_ymd_and_hms(2024, 5, 19, 23, 0, 0).unwrap();
        let yesterday_1am = Utc.with_ymd_and_hms(2024, 5, 19, 1, 0, 0).unwrap();
        let late_today = Utc.with_ymd_and_hms(2024, 5, 20, 23, 0, 0).unwrap();

        let history = vec![entry(yesterday_11pm, true), entry(today_8am, true)];
        assert_eq!(calc.current_streak(&history, now()), 2);

        // 46 hours apart, still consecutive calendar days.
        let history = vec![entry(yesterday_1am, true), entry(late_today, true)];
        assert_eq!(calc.current_streak(&history, late_today), 2);
    }

    #[test]
    fn test_day_boundary_follows_offset() {
        // 23:30 UTC on the 19th is the 20th at UTC+01:00.
        let calc = StreakCalculator::new(Calendar::with_offset_minutes(60));
        let late = Utc.with_ymd_and_hms(2024, 5, 19, 23, 30, 0).unwrap();
        let history = vec![entry(days_ago(1), true), entry(late, true)];
        assert_eq!(calc.current_streak(&history, now()), 2);
        let utc = StreakCalculator::default();
        assert_eq!(utc.current_streak(&history, now()), 1);
    }

    #[test]
    fn test_longest_streak_scans_whole_history() {
        let calc = StreakCalculator::default();
        let history = vec![
            entry(days_ago(10), true),
            entry(days_ago(9), true),
            entry(days_ago(8), true),
            entry(days_ago(7), true),
            entry(days_ago(3), true),
            entry(days_ago(1), true),
            entry(now(), true),
        ];
        assert_eq!(calc.longest_streak(&history), 4);
        assert_eq!(calc.current_streak(&history, now()), 2);
        assert_eq!(calc.longest_streak(&[]), 0);
    }

    #[test]
    fn test_is_active_window_is_inclusive() {
        let calc = StreakCalculator::default();
        let n = now();
        assert!(calc.is_active(Some(n), n));
        assert!(calc.is_active(Some(n - Duration::minutes(1)), n));
        assert!(calc.is_active(Some(n - Duration::hours(23) - Duration::minutes(59)), n));
        assert!(calc.is_active(Some(n - Duration::hours(24)), n));
        assert!(!calc.is_active(Some(n - Duration::hours(24) - Duration::milliseconds(1)), n));
        assert!(!calc.is_active(Some(n - Duration::hours(24) - Duration::seconds(1)), n));
        assert!(!calc.is_active(Some(n - Duration::hours(25)), n));
        assert!(!calc.is_active(None, n));
    }

    #[test]
    fn test_future_completion_is_active() {
        let calc = StreakCalculator::default();
        assert!(calc.is_active(Some(now() + Duration::hours(48)), now()));
    }

    #[test]
    fn test_is_streak_active_from_raw_strings() {
        let n = now();
        let recent = (n - Duration::hours(2)).to_rfc3339();
        assert!(is_streak_active(Some(&recent), n));
        assert!(!is_streak_active(None, n));
        assert!(!is_streak_active(Some(""), n));
        assert!(!is_streak_active(Some("invalid-date"), n));
        assert!(!is_streak_active(Some("2024-99-99"), n));
    }
}
