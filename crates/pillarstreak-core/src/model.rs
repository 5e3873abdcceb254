//! Records exchanged between the core and its caller.
//!
//! Field names follow the persisted JSON layout (camelCase, RFC 3339
//! timestamps). Typed `Deserialize` is strict; lenient import of records
//! written by other producers goes through the `from_json` constructors,
//! which validate at the boundary so the calculators only ever see
//! well-formed values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::calendar::{parse_timestamp, Timestamp};
use crate::error::ValidationError;
use crate::pillar::{Pillar, Target};

/// The pillar assigned for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAssignment {
    /// Fresh on every rotation, so observers can tell a replacement from an
    /// unchanged assignment even when the pillar is the same.
    pub id: Uuid,
    pub date: Timestamp,
    pub pillar: Pillar,
    pub is_manually_set: bool,
    pub target: Target,
    pub progress: f64,
    pub completed: bool,
}

impl DailyAssignment {
    /// New, untouched assignment for `pillar` created at `date`.
    pub fn new(pillar: Pillar, date: Timestamp, is_manually_set: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            pillar,
            is_manually_set,
            target: pillar.target(),
            progress: 0.0,
            completed: false,
        }
    }

    /// Whether recorded progress reaches the target.
    pub fn target_met(&self) -> bool {
        self.target.is_met_by(self.progress)
    }

    /// Copy with updated progress. Negative and non-finite values clamp to 0.
    pub fn with_progress(&self, progress: f64) -> Self {
        let progress = if progress.is_finite() { progress.max(0.0) } else { 0.0 };
        Self {
            progress,
            ..self.clone()
        }
    }

    /// Import a persisted assignment.
    ///
    /// Requires a parseable `date`, a valid `pillar`, numeric `progress` and
    /// boolean `completed`. A missing `id` gets a fresh one; a missing or
    /// malformed `target` is replaced by the pillar's fixed target.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or_else(|| ValidationError::InvalidValue {
            field: "dailyAssignment".into(),
            message: "expected an object".into(),
        })?;

        let date = required_timestamp(obj.get("date"), "date")?;
        let pillar = required_pillar(obj.get("pillar"))?;
        let progress = obj
            .get("progress")
            .and_then(Value::as_f64)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "progress".into(),
                message: "expected a number".into(),
            })?;
        let completed = required_bool(obj.get("completed"), "completed")?;
        let is_manually_set = obj
            .get("isManuallySet")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        let target = obj
            .get("target")
            .and_then(|t| serde_json::from_value::<Target>(t.clone()).ok())
            .unwrap_or_else(|| pillar.target());

        Ok(Self {
            id,
            date,
            pillar,
            is_manually_set,
            target,
            progress,
            completed,
        })
    }
}

/// Measurements captured with a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetrics {
    pub progress: f64,
    pub target: Target,
}

/// One recorded day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: Timestamp,
    pub pillar: Pillar,
    pub completed: bool,
    pub metrics: EntryMetrics,
}

impl HistoryEntry {
    /// Entry recording the outcome of `assignment`.
    pub fn from_assignment(assignment: &DailyAssignment, completed: bool) -> Self {
        Self {
            date: assignment.date,
            pillar: assignment.pillar,
            completed,
            metrics: EntryMetrics {
                progress: assignment.progress,
                target: assignment.target.clone(),
            },
        }
    }

    /// Import one entry.
    ///
    /// An entry is structurally valid when it is an object with a parseable
    /// `date`, a valid `pillar` and a boolean `completed`. `metrics` is
    /// optional; when absent the entry records zero progress against the
    /// pillar's fixed target.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or_else(|| ValidationError::InvalidValue {
            field: "historyEntry".into(),
            message: "expected an object".into(),
        })?;

        let date = required_timestamp(obj.get("date"), "date")?;
        let pillar = required_pillar(obj.get("pillar"))?;
        let completed = required_bool(obj.get("completed"), "completed")?;
        let metrics = obj
            .get("metrics")
            .and_then(|m| serde_json::from_value::<EntryMetrics>(m.clone()).ok())
            .unwrap_or_else(|| EntryMetrics {
                progress: 0.0,
                target: pillar.target(),
            });

        Ok(Self {
            date,
            pillar,
            completed,
            metrics,
        })
    }
}

/// Ordered, append-only record of past days.
pub type PillarHistory = Vec<HistoryEntry>;

/// Streak bookkeeping.
///
/// `current_count` is derived: it always holds the value the streak
/// calculator produced from `pillar_history` when the state was last
/// updated. It is never set independently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub current_count: u32,
    #[serde(default)]
    pub longest_count: u32,
    pub last_completed_date: Option<Timestamp>,
    #[serde(default)]
    pub pillar_history: PillarHistory,
}

/// Idempotency marker for automatic rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationCheckpoint {
    pub last_rotation_check_date: Option<NaiveDate>,
}

impl RotationCheckpoint {
    pub fn at(day: NaiveDate) -> Self {
        Self {
            last_rotation_check_date: Some(day),
        }
    }

    /// Whether an automatic check already ran on `day`.
    pub fn checked_on(&self, day: NaiveDate) -> bool {
        self.last_rotation_check_date == Some(day)
    }
}

/// Per-pillar progress reported by the user profile, nominally 0-100.
///
/// Out-of-range values are kept as-is; missing pillars read as 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillarStats(BTreeMap<Pillar, f64>);

impl PillarStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pillar: Pillar, value: f64) -> Self {
        self.0.insert(pillar, value);
        self
    }

    pub fn set(&mut self, pillar: Pillar, value: f64) {
        self.0.insert(pillar, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stat for `pillar`; missing and NaN values read as 0.
    pub fn get(&self, pillar: Pillar) -> f64 {
        match self.0.get(&pillar) {
            Some(v) if !v.is_nan() => *v,
            _ => 0.0,
        }
    }

    /// Every present value is a finite number.
    pub fn is_well_formed(&self) -> bool {
        self.0.values().all(|v| v.is_finite())
    }

    /// Import a stats object, dropping unknown pillars and non-numeric
    /// values. Anything that is not an object yields empty stats.
    pub fn from_json(value: &Value) -> Self {
        let mut stats = Self::new();
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!(%value, "ignoring non-object pillar stats");
            }
            return stats;
        };
        for (key, raw) in obj {
            match (Pillar::parse(key), raw.as_f64()) {
                (Some(pillar), Some(v)) => stats.set(pillar, v),
                _ => tracing::warn!(key = %key, value = %raw, "dropping malformed pillar stat"),
            }
        }
        stats
    }
}

fn required_timestamp(value: Option<&Value>, field: &str) -> Result<Timestamp, ValidationError> {
    let raw = value.and_then(Value::as_str).unwrap_or_default();
    parse_timestamp(raw).ok_or_else(|| ValidationError::InvalidTimestamp {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn required_pillar(value: Option<&Value>) -> Result<Pillar, ValidationError> {
    match value {
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(ValidationError::InvalidPillar(other.to_string())),
        None => Err(ValidationError::InvalidValue {
            field: "pillar".into(),
            message: "missing".into(),
        }),
    }
}

fn required_bool(value: Option<&Value>, field: &str) -> Result<bool, ValidationError> {
    value
        .and_then(Value::as_bool)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: field.to_string(),
            message: "expected a boolean".into(),
        })
}
