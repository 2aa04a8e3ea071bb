//! Fixpoint optimization of one sub-graph.

use std::collections::{BTreeMap, HashSet};

use sona_ir::{GraphLabel, NativeLibraryRegistry, NodeId, ProgramGraph, Reporting, Result};

use crate::applicator::{Application, apply_rule};
use crate::config::OptimizerConfig;
use crate::guard::CycleGuard;
use crate::index::OptimizationRuleIndex;
use crate::simplify::simplify_graph;
use crate::walker::GraphWalker;

/// Summary of one optimization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationStats {
    /// Total rule applications.
    pub applied: usize,
    /// Applications per rule name.
    pub rules: BTreeMap<String, usize>,
    pub nodes_before: usize,
    pub nodes_after: usize,
    /// Nodes merged by deduplication, both simplifier passes.
    pub merged: usize,
    /// Unreachable nodes removed, both simplifier passes.
    pub pruned: usize,
}

/// Rewrites program graphs with a shared rule index.
pub struct Optimizer<'a, R: NativeLibraryRegistry + ?Sized> {
    index: &'a OptimizationRuleIndex,
    registry: &'a R,
    config: OptimizerConfig,
}

impl<'a, R: NativeLibraryRegistry + ?Sized> Optimizer<'a, R> {
    pub fn new(index: &'a OptimizationRuleIndex, registry: &'a R, config: OptimizerConfig) -> Self {
        Self { index, registry, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize `graph` in place.
    ///
    /// A fatal error is reported once through `reporting` before it is returned.
    ///
    /// # Panics
    ///
    /// Panics if the graph still contains struct nodes.
    #[tracing::instrument(skip_all, fields(graph = %label))]
    pub fn optimize(
        &self,
        graph: &mut ProgramGraph,
        label: GraphLabel,
        reporting: &mut dyn Reporting,
    ) -> Result<OptimizationStats> {
        self.run(graph, label).inspect_err(|error| reporting.report(error.to_diagnostic()))
    }

    fn run(&self, graph: &mut ProgramGraph, label: GraphLabel) -> Result<OptimizationStats> {
        if let Some((id, _)) = graph.nodes().find(|(_, node)| node.is_struct()) {
            panic!("struct node {id} reached the optimizer; structs must be lowered first");
        }
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(tree = %graph.tree(), "graph before optimization");
        }

        let mut stats = OptimizationStats { nodes_before: graph.live_node_count(), ..Default::default() };
        let simplified = simplify_graph(graph);
        stats.merged += simplified.merged;
        stats.pruned += simplified.pruned;

        let mut walker = GraphWalker::new(graph);
        let mut guard = CycleGuard::new(self.config);
        while let Some((node, depth)) = walker.next(graph) {
            let Some(found) = self.index.detect(graph, node) else {
                continue;
            };
            let application = apply_rule(graph, self.registry, found.rule, node, found.multiplier)?;
            guard.check(graph, found.rule, label)?;

            for &(_, new) in &application.replaced {
                if graph.is_sink(new.node) {
                    walker.push_sink(new.node);
                }
            }
            let target = self.rewind_target(graph, &walker, &application, depth);
            tracing::debug!(
                rule = found.rule.name(),
                node = %node,
                multiplier = found.multiplier,
                depth,
                rewind = target,
                created = application.created.len(),
                "applied optimization rule"
            );
            *stats.rules.entry(found.rule.name().to_string()).or_default() += 1;
            stats.applied += 1;
            walker.rewind(target);
        }

        let simplified = simplify_graph(graph);
        stats.merged += simplified.merged;
        stats.pruned += simplified.pruned;
        stats.nodes_after = graph.live_node_count();

        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(tree = %graph.tree(), "graph after optimization");
        }
        tracing::debug!(
            applied = stats.applied,
            nodes_before = stats.nodes_before,
            nodes_after = stats.nodes_after,
            merged = stats.merged,
            pruned = stats.pruned,
            "optimized graph"
        );
        Ok(stats)
    }

    /// Shallowest depth at which an anchor may now match because of `application`.
    ///
    /// A new call can complete a pattern anchored as many levels above it as
    /// its module ever sits below an anchor. An existing call consuming a new
    /// node is one level shallower than the new node and is bounded the same way.
    /// Arrays add no level, so calls reading a new node through arrays count as
    /// direct consumers.
    fn rewind_target(
        &self,
        graph: &ProgramGraph,
        walker: &GraphWalker,
        application: &Application,
        depth: usize,
    ) -> usize {
        let depths = self.index.depths();
        let bound = |node: NodeId, default_depth: usize| -> Option<isize> {
            let call = graph.node(node).as_native_module_call()?;
            let at = walker.depth(node).unwrap_or(default_depth);
            Some(at as isize - depths.depth(call.module.id) as isize)
        };

        let consumers_of = |node: NodeId| {
            graph.node(node).outputs().iter().flat_map(|o| o.connections()).map(|c| c.node).collect::<Vec<_>>()
        };

        let mut target = depth as isize - 1;
        let mut pending = Vec::new();
        for &created in &application.created {
            if let Some(bound) = bound(created, depth + 1) {
                target = target.min(bound);
            }
            pending.extend(consumers_of(created));
        }
        let mut arrays = HashSet::new();
        while let Some(consumer) = pending.pop() {
            if application.created.contains(&consumer) {
                continue;
            }
            if graph.node(consumer).is_array() {
                if arrays.insert(consumer) {
                    pending.extend(consumers_of(consumer));
                }
                continue;
            }
            if let Some(bound) = bound(consumer, depth) {
                target = target.min(bound);
            }
        }
        target.max(0) as usize
    }
}
