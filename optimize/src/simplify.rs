//! Reachability pruning and structural deduplication.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use sona_dtype::{DataType, ValueHash};
use sona_ir::{NativeModuleId, NodeId, NodeKind, OutputPortId, ProgramGraph};

/// What a simplification pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    /// Nodes removed because no sink reaches them.
    pub pruned: usize,
    /// Nodes folded into a structurally equal node.
    pub merged: usize,
}

impl SimplifyStats {
    pub fn is_noop(&self) -> bool {
        self.pruned == 0 && self.merged == 0
    }
}

/// Payload two nodes must share to be merged.
///
/// Side-effecting calls and boundary nodes have no key: they only equal themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Array { element_count: usize, data_type: DataType },
    Constant { data_type: DataType, value: ValueHash },
    Call { module: NativeModuleId, upsample_factor: u32 },
}

impl NodeKey {
    fn of(graph: &ProgramGraph, id: NodeId) -> Option<Self> {
        let node = graph.node(id);
        match node.kind() {
            NodeKind::Array => {
                Some(Self::Array { element_count: node.inputs().len(), data_type: node.output(0).data_type() })
            }
            NodeKind::Constant(value) => {
                Some(Self::Constant { data_type: node.output(0).data_type(), value: ValueHash(value.clone()) })
            }
            NodeKind::NativeModuleCall(call) if !call.has_side_effects => {
                Some(Self::Call { module: call.module.id, upsample_factor: call.upsample_factor })
            }
            _ => None,
        }
    }
}

/// Prune nodes no sink reaches, then merge structurally equal nodes until nothing changes.
#[tracing::instrument(skip_all)]
pub fn simplify_graph(graph: &mut ProgramGraph) -> SimplifyStats {
    let pruned = prune_unreachable(graph);
    let mut merged = 0;
    loop {
        let round = merge_duplicates(graph);
        if round == 0 {
            break;
        }
        merged += round;
    }
    let stats = SimplifyStats { pruned, merged };
    tracing::debug!(pruned, merged, live_nodes = graph.live_node_count(), "simplified graph");
    stats
}

/// Sever every connection into an unreachable node and remove it.
pub fn prune_unreachable(graph: &mut ProgramGraph) -> usize {
    let reachable = graph.reachable();
    let unreachable: Vec<NodeId> = graph.nodes().map(|(id, _)| id).filter(|id| !reachable.contains(id)).collect();
    for &id in &unreachable {
        for index in 0..graph.node(id).inputs().len() {
            graph.disconnect(id.input(index));
        }
    }
    for &id in &unreachable {
        graph.remove(id);
    }
    unreachable.len()
}

/// One dedup sweep in producer-first order. Returns the number of merged nodes.
fn merge_duplicates(graph: &mut ProgramGraph) -> usize {
    let mut kept: HashMap<(NodeKey, Vec<Option<OutputPortId>>), NodeId> = HashMap::new();
    let mut merged = 0;
    for id in topological_order(graph) {
        if graph.is_removed(id) {
            continue;
        }
        let Some(key) = NodeKey::of(graph, id) else {
            continue;
        };
        let inputs = graph.node(id).inputs().iter().map(|i| i.connection()).collect();
        match kept.entry((key, inputs)) {
            Entry::Occupied(entry) => {
                merge_into(graph, id, *entry.get());
                merged += 1;
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }
    }
    merged
}

fn merge_into(graph: &mut ProgramGraph, duplicate: NodeId, original: NodeId) {
    for index in 0..graph.node(duplicate).outputs().len() {
        graph.redirect_consumers(duplicate.output(index), original.output(index), |_| false);
    }
    if graph.is_remain_active(duplicate) {
        graph.mark_remain_active(original);
    }
    graph.remove(duplicate);
}

/// Reachable nodes, every producer before its consumers.
fn topological_order(graph: &ProgramGraph) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(graph.live_node_count());
    let mut visited = vec![false; graph.len()];
    for sink in graph.sinks() {
        let mut stack = vec![(sink, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;
            stack.push((id, true));
            for input in graph.node(id).inputs().iter().rev() {
                if let Some(source) = input.connection()
                    && !visited[source.node.index()]
                {
                    stack.push((source.node, false));
                }
            }
        }
    }
    order
}
