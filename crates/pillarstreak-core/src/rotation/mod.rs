mod orchestrator;
mod strategy;

pub use orchestrator::{
    rotate, RotationDecision, RotationOrchestrator, RotationOutcome, RotationRequest,
};
pub use strategy::{
    get_rotation_strategy, pillar_weights, round_robin, stats_based, weighted_random,
    StrategyFn, StrategyRegistry, ROUND_ROBIN, STATS_BASED, WEIGHTED_RANDOM,
};
