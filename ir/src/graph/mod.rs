//! Program graph: an arena of processor nodes joined by port connections.
//!
//! Connections are stored on both ends: an input port names at most one output
//! port, and every output port keeps the set of input ports naming it. All
//! mutation goes through [`ProgramGraph::connect`] and
//! [`ProgramGraph::disconnect`], which update both sides together.
//!
//! Nodes are never freed. A node that loses every consumer is disconnected
//! from its own inputs and flagged as removed; its [`NodeId`] stays valid.

pub mod node;
pub mod tree;

use std::collections::BTreeSet;
use std::sync::Arc;

use smallvec::{SmallVec, smallvec};
use sona_dtype::{DataType, Value};

use crate::native::NativeModule;

pub use node::{InputPort, InputPortId, NativeModuleCall, NodeId, NodeKind, OutputPort, OutputPortId, ProcessorNode};

/// Which sub-graph of a program is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GraphLabel {
    Voice,
    Effect,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramGraph {
    nodes: Vec<ProcessorNode>,
    remain_active: BTreeSet<NodeId>,
    live_nodes: usize,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Node construction
    // =========================================================================

    fn push(&mut self, kind: NodeKind, input_count: usize, outputs: SmallVec<[OutputPort; 2]>) -> NodeId {
        let index = u32::try_from(self.nodes.len()).expect("program graph exceeds u32::MAX nodes");
        self.nodes.push(ProcessorNode {
            kind,
            inputs: (0..input_count).map(|_| InputPort::default()).collect(),
            outputs,
            removed: false,
        });
        self.live_nodes += 1;
        NodeId(index)
    }

    pub fn add_constant(&mut self, value: Value) -> NodeId {
        let data_type = DataType::scalar(value.primitive_type());
        self.push(NodeKind::Constant(value), 0, smallvec![OutputPort::new(data_type, 0)])
    }

    /// Array node with `element_count` unconnected element inputs.
    ///
    /// `data_type` is the type of the array output; it is forced to be an array type.
    pub fn add_array(&mut self, data_type: DataType, element_count: usize) -> NodeId {
        self.push(NodeKind::Array, element_count, smallvec![OutputPort::new(data_type.as_array(), 0)])
    }

    pub fn add_graph_input(&mut self, data_type: DataType, latency: u32) -> NodeId {
        self.push(NodeKind::GraphInput, 0, smallvec![OutputPort::new(data_type, latency)])
    }

    pub fn add_graph_output(&mut self) -> NodeId {
        self.push(NodeKind::GraphOutput, 1, SmallVec::new())
    }

    /// Call node with one input per "in" parameter and one output per "out" parameter.
    pub fn add_native_module_call(&mut self, module: &Arc<NativeModule>, upsample_factor: u32, latency: u32) -> NodeId {
        assert!(upsample_factor > 0, "native module call '{}' has upsample factor 0", module.name);
        let outputs = module.out_parameters().map(|p| OutputPort::new(p.data_type(upsample_factor), latency)).collect();
        let call = NativeModuleCall {
            module: Arc::clone(module),
            upsample_factor,
            latency,
            has_side_effects: module.has_side_effects,
        };
        self.push(NodeKind::NativeModuleCall(call), module.in_count(), outputs)
    }

    /// Struct node. Only graph builders produce these; the optimizer rejects them.
    pub fn add_struct(&mut self, field_types: &[DataType]) -> NodeId {
        let outputs = field_types.iter().map(|&t| OutputPort::new(t, 0)).collect();
        self.push(NodeKind::Struct, field_types.len(), outputs)
    }

    /// Keep `node` alive even without a path to a graph output.
    pub fn mark_remain_active(&mut self, node: NodeId) {
        self.assert_live(node);
        self.remain_active.insert(node);
    }

    /// Clear the remain-active mark of `node`, returning whether it was set.
    pub fn unmark_remain_active(&mut self, node: NodeId) -> bool {
        self.remain_active.remove(&node)
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn node(&self, id: NodeId) -> &ProcessorNode {
        &self.nodes[id.index()]
    }

    pub fn output(&self, port: OutputPortId) -> &OutputPort {
        &self.nodes[port.node.index()].outputs[port.index]
    }

    pub fn connection(&self, input: InputPortId) -> Option<OutputPortId> {
        self.nodes[input.node.index()].inputs[input.index].connection
    }

    pub fn consumers(&self, output: OutputPortId) -> &[InputPortId] {
        &self.output(output).connections
    }

    /// Node feeding input `index` of `node`, if connected.
    pub fn input_node(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.connection(node.input(index)).map(|o| o.node)
    }

    /// Number of nodes ever created, removed ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn live_node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.nodes[id.index()].removed
    }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ProcessorNode)> {
        self.nodes.iter().enumerate().filter(|(_, n)| !n.removed).map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn is_remain_active(&self, id: NodeId) -> bool {
        self.remain_active.contains(&id)
    }

    pub fn is_sink(&self, id: NodeId) -> bool {
        let node = self.node(id);
        !node.removed
            && (matches!(node.kind, NodeKind::GraphOutput) || node.has_side_effects() || self.is_remain_active(id))
    }

    /// Graph outputs, side-effecting calls and remain-active nodes, in creation order.
    pub fn sinks(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).filter(|&id| self.is_sink(id)).collect()
    }

    /// Nodes with a path to a sink, found by walking every input connection backwards.
    pub fn reachable(&self) -> BTreeSet<NodeId> {
        self.reachable_from(&self.sinks())
    }

    pub fn reachable_from(&self, roots: &[NodeId]) -> BTreeSet<NodeId> {
        let mut reachable = BTreeSet::new();
        let mut stack: Vec<NodeId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for input in &self.node(id).inputs {
                if let Some(output) = input.connection
                    && !reachable.contains(&output.node)
                {
                    stack.push(output.node);
                }
            }
        }
        reachable
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Connect `input` to `output`, replacing any previous connection of `input`.
    pub fn connect(&mut self, input: InputPortId, output: OutputPortId) {
        self.assert_live(input.node);
        self.assert_live(output.node);
        assert!(
            output.index < self.node(output.node).outputs.len(),
            "{} has no output {}",
            output.node,
            output.index
        );
        if self.connection(input) == Some(output) {
            return;
        }
        self.disconnect(input);
        self.nodes[input.node.index()].inputs[input.index].connection = Some(output);
        self.nodes[output.node.index()].outputs[output.index].connections.push(input);
    }

    /// Clear the connection of `input`, returning the output it was connected to.
    pub fn disconnect(&mut self, input: InputPortId) -> Option<OutputPortId> {
        let previous = self.nodes[input.node.index()].inputs[input.index].connection.take()?;
        let connections = &mut self.nodes[previous.node.index()].outputs[previous.index].connections;
        let Some(position) = connections.iter().position(|&c| c == input) else {
            panic!("connection of {input:?} is missing from the consumers of {previous:?}");
        };
        connections.remove(position);
        Some(previous)
    }

    /// Move every consumer of `from` onto `to`, except those `skip` rejects.
    ///
    /// Returns the number of moved connections.
    pub fn redirect_consumers(
        &mut self,
        from: OutputPortId,
        to: OutputPortId,
        mut skip: impl FnMut(InputPortId) -> bool,
    ) -> usize {
        if from == to {
            return 0;
        }
        let moved: SmallVec<[InputPortId; 4]> = self.consumers(from).iter().copied().filter(|&c| !skip(c)).collect();
        for &consumer in &moved {
            self.connect(consumer, to);
        }
        moved.len()
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Disconnect `node` from its inputs and flag it as removed.
    ///
    /// # Panics
    ///
    /// Panics if any output of `node` still has consumers.
    pub fn remove(&mut self, node: NodeId) {
        self.assert_live(node);
        assert!(!self.node(node).has_consumers(), "cannot remove {node}: it still has consumers");
        for index in 0..self.node(node).inputs.len() {
            self.disconnect(node.input(index));
        }
        self.remain_active.remove(&node);
        self.nodes[node.index()].removed = true;
        self.live_nodes -= 1;
    }

    /// Whether `node` is live, not a sink, and nothing consumes its outputs.
    pub fn is_dead(&self, node: NodeId) -> bool {
        let n = self.node(node);
        !n.removed && !n.has_consumers() && !self.is_sink(node)
    }

    /// Remove `node` if it is dead, then every producer left dead by that removal.
    ///
    /// Returns the number of removed nodes.
    pub fn remove_if_dead(&mut self, node: NodeId) -> usize {
        let mut removed = 0;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if !self.is_dead(id) {
                continue;
            }
            let producers: SmallVec<[NodeId; 4]> =
                self.node(id).inputs.iter().filter_map(|i| i.connection).map(|o| o.node).collect();
            self.remove(id);
            removed += 1;
            stack.extend(producers);
        }
        removed
    }

    fn assert_live(&self, node: NodeId) {
        assert!(node.index() < self.nodes.len(), "{node} does not belong to this graph");
        assert!(!self.nodes[node.index()].removed, "{node} has been removed");
    }
}
