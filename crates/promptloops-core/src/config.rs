use serde::{Deserialize, Serialize};

/// Where observation deduplication happens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Trust the critic: it sees existing observations and returns an empty
    /// string when nothing new applies
    #[default]
    Critic,
    /// Additionally skip observations whose normalized text is already logged
    Store,
}

/// Policy constants governing the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Every dimension's magnitude must be below this to stop satisfied
    pub satisfied_magnitude: i32,
    /// A per-dimension improvement at or below this stops on regression
    pub regression_limit: i32,
    /// Mean improvement below this stops on diminishing returns
    pub min_avg_improvement: f64,
    /// Mean absolute accumulated error above this forces a rewrite
    pub error_trigger: f64,
    /// A rewrite is forced once this many turns have accumulated
    pub cycle_trigger: u32,
    pub dedup: DedupPolicy,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            satisfied_magnitude: 15,
            regression_limit: -10,
            min_avg_improvement: 4.0,
            error_trigger: 80.0,
            cycle_trigger: 5,
            dedup: DedupPolicy::Critic,
        }
    }
}
