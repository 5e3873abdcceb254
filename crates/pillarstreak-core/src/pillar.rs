//! The three habit pillars and their fixed daily targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A daily focus category.
///
/// Declaration order is the canonical enumeration order: round-robin
/// sequencing and stats tie-breaking both follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    Nutrition,
    Sleep,
    Movement,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [Pillar::Nutrition, Pillar::Sleep, Pillar::Movement];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Nutrition => "nutrition",
            Pillar::Sleep => "sleep",
            Pillar::Movement => "movement",
        }
    }

    /// Exact, case-sensitive lookup. `" sleep"` and `"Sleep"` are rejected.
    pub fn parse(name: &str) -> Option<Pillar> {
        Pillar::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// The pillar after this one in rotation order, wrapping around.
    pub fn next(&self) -> Pillar {
        match self {
            Pillar::Nutrition => Pillar::Sleep,
            Pillar::Sleep => Pillar::Movement,
            Pillar::Movement => Pillar::Nutrition,
        }
    }

    /// Fixed daily target for this pillar.
    pub fn target(&self) -> Target {
        match self {
            Pillar::Nutrition => Target::new(TargetKind::Meals, 3.0, "comidas saludables"),
            Pillar::Sleep => Target::new(TargetKind::Hours, 8.0, "horas"),
            Pillar::Movement => Target::new(TargetKind::Minutes, 30.0, "minutos"),
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pillar {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pillar::parse(s).ok_or_else(|| ValidationError::InvalidPillar(s.to_string()))
    }
}

/// Unit family of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Meals,
    Hours,
    Minutes,
}

/// Immutable per-pillar goal copied into each new assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub value: f64,
    pub unit: String,
}

impl Target {
    fn new(kind: TargetKind, value: f64, unit: &str) -> Self {
        Self {
            kind,
            value,
            unit: unit.to_string(),
        }
    }

    /// Whether `progress` reaches this target.
    pub fn is_met_by(&self, progress: f64) -> bool {
        progress >= self.value
    }
}
