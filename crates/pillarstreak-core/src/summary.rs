//! Aggregate figures over pillar history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::HistoryEntry;
use crate::pillar::Pillar;

/// Completion totals for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_entries: usize,
    pub completed_entries: usize,
    /// Completed share of all entries, rounded to a whole percent.
    pub completion_rate: u32,
    /// Completed entries per pillar; every pillar is present.
    pub completed_by_pillar: BTreeMap<Pillar, usize>,
}

pub fn summarize_history(history: &[HistoryEntry]) -> HistorySummary {
    let mut completed_by_pillar: BTreeMap<Pillar, usize> =
        Pillar::ALL.into_iter().map(|p| (p, 0)).collect();

    let mut completed_entries = 0;
    for entry in history.iter().filter(|e| e.completed) {
        completed_entries += 1;
        *completed_by_pillar.entry(entry.pillar).or_default() += 1;
    }

    let completion_rate = if history.is_empty() {
        0
    } else {
        (completed_entries as f64 / history.len() as f64 * 100.0).round() as u32
    };

    HistorySummary {
        total_entries: history.len(),
        completed_entries,
        completion_rate,
        completed_by_pillar,
    }
}
