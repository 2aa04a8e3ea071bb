//! Build-once rule index shared by every optimization run.

use std::collections::BTreeSet;

use sona_ir::{NodeId, OptimizationRule, ProgramGraph};

use crate::comparer::RuleComparer;
use crate::depth::ComponentDepthTracker;
use crate::recognizer::RuleRecognizer;

/// A rule selected for a node.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub rule: &'a OptimizationRule,
    /// Factor by which the matched graph's upsample factors exceed the rule's.
    pub multiplier: u32,
}

/// Rule database with its recognizer, comparer and depth table.
///
/// Immutable after construction; share it by reference between the voice and
/// effect graph optimizations.
#[derive(Debug, Clone)]
pub struct OptimizationRuleIndex {
    rules: Vec<OptimizationRule>,
    recognizer: RuleRecognizer,
    comparer: RuleComparer,
    depths: ComponentDepthTracker,
}

impl OptimizationRuleIndex {
    /// # Panics
    ///
    /// Panics if two rules share a name.
    pub fn new(rules: Vec<OptimizationRule>) -> Self {
        let mut names = BTreeSet::new();
        for rule in &rules {
            assert!(names.insert(rule.name()), "duplicate optimization rule name '{}'", rule.name());
        }

        let recognizer = RuleRecognizer::new(&rules);
        let comparer = RuleComparer::new(&rules);
        let depths = ComponentDepthTracker::new(&rules);
        tracing::debug!(
            rules = rules.len(),
            roots = recognizer.root_count(),
            trie_nodes = recognizer.trie_node_count(),
            tracked_modules = depths.len(),
            "built optimization rule index"
        );
        Self { rules, recognizer, comparer, depths }
    }

    pub fn rules(&self) -> &[OptimizationRule] {
        &self.rules
    }

    pub fn recognizer(&self) -> &RuleRecognizer {
        &self.recognizer
    }

    pub fn comparer(&self) -> &RuleComparer {
        &self.comparer
    }

    pub fn depths(&self) -> &ComponentDepthTracker {
        &self.depths
    }

    /// The most specific rule matching the subgraph rooted at `node`, if any.
    pub fn detect(&self, graph: &ProgramGraph, node: NodeId) -> Option<RuleMatch<'_>> {
        let candidates = self.recognizer.candidates(graph, node);
        let best = self.comparer.best(&self.rules, candidates.iter().map(|c| c.rule))?;
        let candidate = candidates.iter().find(|c| c.rule == best)?;
        Some(RuleMatch { rule: &self.rules[best], multiplier: candidate.multiplier })
    }
}
