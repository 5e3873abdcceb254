//! Pillar history: boundary import, retention and the per-day calendar view.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::{Calendar, Timestamp};
use crate::model::{HistoryEntry, PillarHistory};

/// Import a history array, silently dropping structurally invalid entries.
///
/// `null` or a non-array value is an empty history.
pub fn parse_history(value: &Value) -> PillarHistory {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            tracing::warn!("pillar history is not an array, treating as empty");
        }
        return Vec::new();
    };

    let mut dropped = 0usize;
    let history: PillarHistory = items
        .iter()
        .filter_map(|item| match HistoryEntry::from_json(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                dropped += 1;
                tracing::debug!(error = %e, "dropping history entry");
                None
            }
        })
        .collect();

    if dropped > 0 {
        tracing::warn!(dropped, kept = history.len(), "dropped invalid history entries");
    }
    history
}

/// Entries whose calendar day lies within the last `retention_days` days
/// (today counts as day one). Order is preserved.
///
/// The streak protocol never calls this; it is the persistence layer's
/// pruning policy.
pub fn retain_recent(
    history: &[HistoryEntry],
    retention_days: u32,
    now: Timestamp,
    calendar: &Calendar,
) -> PillarHistory {
    if retention_days == 0 {
        return Vec::new();
    }
    let today = calendar.day_of(now);
    let oldest = today - Duration::days(i64::from(retention_days) - 1);
    history
        .iter()
        .filter(|e| calendar.day_of(e.date) >= oldest)
        .cloned()
        .collect()
}

/// How much of a day was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// No entries recorded.
    Empty,
    /// At least one entry completed, not all.
    Partial,
    /// Every entry completed.
    Complete,
    /// Entries recorded, none completed.
    Missed,
}

/// One cell of the calendar view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
    pub status: DayStatus,
    pub entries: Vec<HistoryEntry>,
}

/// The last `days` calendar days ending today, oldest first, with every
/// entry recorded on each day.
pub fn calendar_view(
    history: &[HistoryEntry],
    days: u32,
    now: Timestamp,
    calendar: &Calendar,
) -> Vec<CalendarDay> {
    let today = calendar.day_of(now);
    (0..i64::from(days))
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let entries: Vec<HistoryEntry> = history
                .iter()
                .filter(|e| calendar.day_of(e.date) == date)
                .cloned()
                .collect();
            CalendarDay {
                date,
                is_today: date == today,
                status: day_status(&entries),
                entries,
            }
        })
        .collect()
}

fn day_status(entries: &[HistoryEntry]) -> DayStatus {
    if entries.is_empty() {
        return DayStatus::Empty;
    }
    let done = entries.iter().filter(|e| e.completed).count();
    if done == entries.len() {
        DayStatus::Complete
    } else if done > 0 {
        DayStatus::Partial
    } else {
        DayStatus::Missed
    }
}
