//! Interchangeable pillar-selection strategies.
//!
//! Every strategy has the same shape: given user stats and history, pick the
//! next pillar. Strategies hold no state and never mutate their inputs; the
//! only side effect allowed is drawing from the injected random source.

use std::collections::HashMap;
use std::fmt;

use rand::{Rng, RngCore};

use crate::model::{HistoryEntry, PillarStats};
use crate::pillar::Pillar;

/// Selection function signature shared by all strategies.
pub type StrategyFn = fn(&PillarStats, &[HistoryEntry], &mut dyn RngCore) -> Pillar;

pub const ROUND_ROBIN: &str = "round-robin";
pub const STATS_BASED: &str = "stats-based";
pub const WEIGHTED_RANDOM: &str = "weighted-random";

/// Upper end of the nominal stat range, used to invert stats into weights.
const MAX_STAT: f64 = 100.0;

/// Cycle nutrition → sleep → movement → nutrition, continuing from the most
/// recent history entry. Empty history starts at nutrition. Stats are
/// ignored.
pub fn round_robin(_stats: &PillarStats, history: &[HistoryEntry], _rng: &mut dyn RngCore) -> Pillar {
    history
        .last()
        .map(|entry| entry.pillar.next())
        .unwrap_or(Pillar::Nutrition)
}

/// Pick the pillar with the lowest stat; ties go to the earliest pillar in
/// enumeration order. Empty stats fall back to round-robin.
pub fn stats_based(stats: &PillarStats, history: &[HistoryEntry], rng: &mut dyn RngCore) -> Pillar {
    if stats.is_empty() {
        return round_robin(stats, history, rng);
    }

    let mut lowest = Pillar::Nutrition;
    let mut lowest_value = stats.get(lowest);
    for pillar in Pillar::ALL {
        let value = stats.get(pillar);
        if value < lowest_value {
            lowest = pillar;
            lowest_value = value;
        }
    }
    lowest
}

/// Random pick weighted towards weaker pillars: `weight = max(1, 101 - stat)`.
/// Empty stats fall back to round-robin.
pub fn weighted_random(stats: &PillarStats, history: &[HistoryEntry], rng: &mut dyn RngCore) -> Pillar {
    if stats.is_empty() {
        return round_robin(stats, history, rng);
    }

    let weights = pillar_weights(stats);
    let total: f64 = weights.iter().sum();

    if !total.is_finite() {
        // An infinitely weak pillar dominates every finite one.
        tracing::warn!(?weights, "non-finite rotation weights");
        return heaviest(&weights);
    }

    let mut remaining = rng.gen::<f64>() * total;
    for (pillar, weight) in Pillar::ALL.into_iter().zip(weights) {
        remaining -= weight;
        if remaining <= 0.0 {
            return pillar;
        }
    }
    Pillar::Movement
}

/// Selection weight per pillar, in enumeration order.
pub fn pillar_weights(stats: &PillarStats) -> [f64; 3] {
    Pillar::ALL.map(|pillar| (MAX_STAT - stats.get(pillar) + 1.0).max(1.0))
}

fn heaviest(weights: &[f64; 3]) -> Pillar {
    let mut best = 0;
    for (i, w) in weights.iter().enumerate() {
        if *w > weights[best] {
            best = i;
        }
    }
    Pillar::ALL[best]
}

/// Named strategies with round-robin as the fallback for unknown names.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, StrategyFn>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyRegistry {
    /// Registry with no strategies; every lookup falls back to round-robin.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// The three built-in strategies.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ROUND_ROBIN, round_robin);
        registry.register(STATS_BASED, stats_based);
        registry.register(WEIGHTED_RANDOM, weighted_random);
        registry
    }

    /// Add or replace a strategy.
    pub fn register(&mut self, name: &'static str, strategy: StrategyFn) {
        self.strategies.insert(name, strategy);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.strategies.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Exact-match lookup. Unknown names (wrong case, stray whitespace)
    /// resolve to round-robin.
    pub fn get(&self, name: &str) -> StrategyFn {
        match self.strategies.get(name) {
            Some(strategy) => *strategy,
            None => {
                tracing::warn!(strategy = name, "unknown rotation strategy, using round-robin");
                round_robin
            }
        }
    }
}

/// Look up a built-in strategy by name, falling back to round-robin.
pub fn get_rotation_strategy(name: &str) -> StrategyFn {
    StrategyRegistry::builtin().get(name)
}
