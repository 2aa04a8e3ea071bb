//! Optimizer configuration.
//!
//! Built with a bon builder, or read from the environment with defaults for
//! anything unset or unparseable.

/// Default number of rule applications before cycle detection starts fingerprinting.
pub const DEFAULT_START_CYCLE_DETECTION_RULE_COUNT: usize = 1000;

/// Default live node count above which optimization aborts.
pub const DEFAULT_TOO_MANY_NODES_THRESHOLD: usize = 100_000;

/// Limits guarding a single optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct OptimizerConfig {
    /// Rule applications allowed before each further application is fingerprinted.
    #[builder(default = DEFAULT_START_CYCLE_DETECTION_RULE_COUNT)]
    pub start_cycle_detection_rule_count: usize,
    /// Live node count that must not be exceeded after a rule application.
    #[builder(default = DEFAULT_TOO_MANY_NODES_THRESHOLD)]
    pub too_many_nodes_threshold: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            start_cycle_detection_rule_count: DEFAULT_START_CYCLE_DETECTION_RULE_COUNT,
            too_many_nodes_threshold: DEFAULT_TOO_MANY_NODES_THRESHOLD,
        }
    }
}

impl OptimizerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `SONA_CYCLE_DETECTION_START=N` - rule applications before fingerprinting starts
    /// * `SONA_TOO_MANY_NODES=N` - live node threshold
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| lookup(key).and_then(|s| s.trim().parse().ok()).unwrap_or(default);
        Self {
            start_cycle_detection_rule_count: read(
                "SONA_CYCLE_DETECTION_START",
                DEFAULT_START_CYCLE_DETECTION_RULE_COUNT,
            ),
            too_many_nodes_threshold: read("SONA_TOO_MANY_NODES", DEFAULT_TOO_MANY_NODES_THRESHOLD),
        }
    }
}
