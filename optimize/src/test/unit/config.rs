use std::collections::HashMap;

use test_case::test_case;

use crate::config::{DEFAULT_START_CYCLE_DETECTION_RULE_COUNT, DEFAULT_TOO_MANY_NODES_THRESHOLD, OptimizerConfig};

fn from_vars(vars: &[(&str, &str)]) -> OptimizerConfig {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    OptimizerConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = OptimizerConfig::default();
    assert_eq!(config.start_cycle_detection_rule_count, 1000);
    assert_eq!(config.too_many_nodes_threshold, 100_000);
    assert_eq!(OptimizerConfig::builder().build(), config);
}

#[test]
fn test_builder_overrides() {
    let config = OptimizerConfig::builder().start_cycle_detection_rule_count(5).too_many_nodes_threshold(50).build();
    assert_eq!(config.start_cycle_detection_rule_count, 5);
    assert_eq!(config.too_many_nodes_threshold, 50);
}

#[test]
fn test_environment_overrides() {
    let config = from_vars(&[("SONA_CYCLE_DETECTION_START", "12"), ("SONA_TOO_MANY_NODES", " 3400 ")]);
    assert_eq!(config, OptimizerConfig { start_cycle_detection_rule_count: 12, too_many_nodes_threshold: 3400 });
}

#[test_case("", DEFAULT_START_CYCLE_DETECTION_RULE_COUNT; "empty")]
#[test_case("many", DEFAULT_START_CYCLE_DETECTION_RULE_COUNT; "not a number")]
#[test_case("-1", DEFAULT_START_CYCLE_DETECTION_RULE_COUNT; "negative")]
#[test_case("0", 0; "zero")]
fn test_unparseable_values_fall_back(value: &str, expected: usize) {
    let config = from_vars(&[("SONA_CYCLE_DETECTION_START", value)]);
    assert_eq!(config.start_cycle_detection_rule_count, expected);
    assert_eq!(config.too_many_nodes_threshold, DEFAULT_TOO_MANY_NODES_THRESHOLD);
}
