//! Cycle and growth guard for rewrite sequences.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use snafu::ensure;
use sona_dtype::ValueHash;
use sona_ir::error::{OptimizationRuleCycleSnafu, TooManyNodesSnafu};
use sona_ir::{GraphLabel, NodeId, NodeKind, OptimizationRule, ProgramGraph, Result};

use crate::config::OptimizerConfig;

/// Structural identity of the live graph: combined sink hashes and live node count.
pub type Fingerprint = (u64, usize);

/// Aborts rewriting that grows the graph too far or revisits an earlier graph shape.
#[derive(Debug, Clone)]
pub struct CycleGuard {
    config: OptimizerConfig,
    applied: usize,
    fingerprints: HashSet<Fingerprint>,
}

impl CycleGuard {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config, applied: 0, fingerprints: HashSet::new() }
    }

    /// Number of rule applications checked so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Check the graph after `rule` was applied to it.
    ///
    /// # Errors
    ///
    /// [`TooManyNodes`](sona_ir::Error::TooManyNodes) once the live node count
    /// exceeds the threshold, and
    /// [`OptimizationRuleCycle`](sona_ir::Error::OptimizationRuleCycle) when a
    /// graph fingerprint repeats after cycle detection has started.
    pub fn check(&mut self, graph: &ProgramGraph, rule: &OptimizationRule, label: GraphLabel) -> Result<()> {
        self.applied += 1;

        let node_count = graph.live_node_count();
        let threshold = self.config.too_many_nodes_threshold;
        ensure!(node_count <= threshold, TooManyNodesSnafu { graph: label, node_count, threshold });

        if self.applied > self.config.start_cycle_detection_rule_count {
            let fingerprint = fingerprint(graph);
            ensure!(self.fingerprints.insert(fingerprint), OptimizationRuleCycleSnafu { graph: label, rule: rule.name() });
        }
        Ok(())
    }
}

/// Fingerprint of the live graph.
///
/// Nodes hash by the payload the simplifier compares (boundary nodes by
/// identity) together with the hashes and port indices of their inputs.
pub fn fingerprint(graph: &ProgramGraph) -> Fingerprint {
    let mut memo: Vec<Option<u64>> = vec![None; graph.len()];
    let mut hasher = DefaultHasher::new();
    for sink in graph.sinks() {
        structural_hash(graph, &mut memo, sink).hash(&mut hasher);
    }
    (hasher.finish(), graph.live_node_count())
}

fn structural_hash(graph: &ProgramGraph, memo: &mut [Option<u64>], root: NodeId) -> u64 {
    // Post-order without recursion: a node is hashed once all its producers are.
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if memo[id.index()].is_some() {
            continue;
        }
        let node = graph.node(id);
        if !expanded {
            stack.push((id, true));
            for input in node.inputs() {
                if let Some(source) = input.connection()
                    && memo[source.node.index()].is_none()
                {
                    stack.push((source.node, false));
                }
            }
            continue;
        }

        let mut hasher = DefaultHasher::new();
        std::mem::discriminant(node.kind()).hash(&mut hasher);
        match node.kind() {
            NodeKind::Array => node.output(0).data_type().hash(&mut hasher),
            NodeKind::Constant(value) => {
                node.output(0).data_type().hash(&mut hasher);
                ValueHash(value.clone()).hash(&mut hasher);
            }
            NodeKind::NativeModuleCall(call) => {
                call.module.id.hash(&mut hasher);
                call.upsample_factor.hash(&mut hasher);
            }
            NodeKind::GraphInput | NodeKind::GraphOutput | NodeKind::Struct => id.hash(&mut hasher),
        }
        node.inputs().len().hash(&mut hasher);
        for input in node.inputs() {
            match input.connection() {
                Some(source) => {
                    memo[source.node.index()].hash(&mut hasher);
                    source.index.hash(&mut hasher);
                }
                None => None::<u64>.hash(&mut hasher),
            }
        }
        memo[id.index()] = Some(hasher.finish());
    }
    memo[root.index()].unwrap_or_default()
}
