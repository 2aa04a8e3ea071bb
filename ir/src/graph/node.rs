//! Processor nodes and their ports.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use sona_dtype::{DataType, Value};

use crate::native::NativeModule;

/// Handle of a node in a [`ProgramGraph`](super::ProgramGraph) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn output(self, index: usize) -> OutputPortId {
        OutputPortId { node: self, index }
    }

    pub const fn input(self, index: usize) -> InputPortId {
        InputPortId { node: self, index }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputPortId {
    pub node: NodeId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputPortId {
    pub node: NodeId,
    pub index: usize,
}

/// Call into a native module.
#[derive(Debug, Clone)]
pub struct NativeModuleCall {
    pub module: Arc<NativeModule>,
    pub upsample_factor: u32,
    pub latency: u32,
    /// Copied from the module when the call is created.
    pub has_side_effects: bool,
}

/// Node variant.
#[derive(Debug, Clone, strum::AsRefStr)]
pub enum NodeKind {
    /// Ordered elements in, one array out.
    Array,
    Constant(Value),
    GraphInput,
    GraphOutput,
    NativeModuleCall(NativeModuleCall),
    /// Must be lowered away before optimization.
    Struct,
}

#[derive(Debug, Clone)]
pub struct OutputPort {
    pub(crate) data_type: DataType,
    pub(crate) latency: u32,
    pub(crate) connections: SmallVec<[InputPortId; 2]>,
}

impl OutputPort {
    pub(crate) fn new(data_type: DataType, latency: u32) -> Self {
        Self { data_type, latency, connections: SmallVec::new() }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Input ports currently connected to this output, in connection order.
    pub fn connections(&self) -> &[InputPortId] {
        &self.connections
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputPort {
    pub(crate) connection: Option<OutputPortId>,
}

impl InputPort {
    pub fn connection(&self) -> Option<OutputPortId> {
        self.connection
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorNode {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: SmallVec<[InputPort; 4]>,
    pub(crate) outputs: SmallVec<[OutputPort; 2]>,
    pub(crate) removed: bool,
}

impl ProcessorNode {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    pub fn output(&self, index: usize) -> &OutputPort {
        &self.outputs[index]
    }

    pub fn input_connection(&self, index: usize) -> Option<OutputPortId> {
        self.inputs[index].connection
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn has_consumers(&self) -> bool {
        self.outputs.iter().any(|o| !o.connections.is_empty())
    }

    pub fn has_side_effects(&self) -> bool {
        matches!(&self.kind, NodeKind::NativeModuleCall(call) if call.has_side_effects)
    }

    pub fn as_native_module_call(&self) -> Option<&NativeModuleCall> {
        match &self.kind {
            NodeKind::NativeModuleCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, NodeKind::Array)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, NodeKind::Struct)
    }
}
