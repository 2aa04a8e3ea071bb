//! Deepest position at which each native module occurs in any input pattern.

use std::collections::BTreeMap;

use sona_ir::{NativeModuleId, OptimizationRule, PatternComponent};

/// Read-only table of per-module maximum pattern depth.
///
/// The anchor sits at depth 0 and every nested call one level below its
/// parent; arrays do not add a level. Modules that appear in no pattern
/// have depth 0.
#[derive(Debug, Clone, Default)]
pub struct ComponentDepthTracker {
    depths: BTreeMap<NativeModuleId, usize>,
}

impl ComponentDepthTracker {
    pub fn new(rules: &[OptimizationRule]) -> Self {
        let mut tracker = Self::default();
        for rule in rules {
            tracker.record(rule.input_pattern(), 0);
        }
        tracker
    }

    fn record(&mut self, component: &PatternComponent, depth: usize) {
        match component {
            PatternComponent::NativeModuleCall(call) => {
                let entry = self.depths.entry(call.module.id).or_default();
                *entry = (*entry).max(depth);
                for input in call.inputs() {
                    self.record(input, depth + 1);
                }
            }
            PatternComponent::Array { elements, .. } => {
                for element in elements {
                    self.record(element, depth);
                }
            }
            _ => {}
        }
    }

    pub fn depth(&self, module: NativeModuleId) -> usize {
        self.depths.get(&module).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}
