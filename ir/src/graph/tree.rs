//! Tree visualization for program graphs.
//!
//! The graph is rendered from its sinks towards its inputs. A producer shared
//! by several consumers is expanded once; later occurrences show
//! `%id → (see above)`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use super::{NodeId, NodeKind, OutputPortId, ProgramGraph};

#[derive(Clone)]
pub struct ProgramGraphTree<'a> {
    graph: &'a ProgramGraph,
    /// `None` for the synthetic root grouping every sink.
    port: Option<OutputPortId>,
    node: Option<NodeId>,
    visited: Rc<RefCell<HashSet<NodeId>>>,
    is_backref: RefCell<bool>,
}

impl<'a> ProgramGraphTree<'a> {
    pub fn new(graph: &'a ProgramGraph) -> Self {
        Self {
            graph,
            port: None,
            node: None,
            visited: Rc::new(RefCell::new(HashSet::new())),
            is_backref: RefCell::new(false),
        }
    }

    fn child(&self, node: NodeId, port: Option<OutputPortId>) -> Self {
        Self { graph: self.graph, port, node: Some(node), visited: self.visited.clone(), is_backref: RefCell::new(false) }
    }
}

impl TreeItem for ProgramGraphTree<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let Some(node) = self.node else {
            return write!(f, "graph ({} live nodes)", self.graph.live_node_count());
        };
        let port = match self.port {
            Some(port) if self.graph.node(node).outputs().len() > 1 => format!(".{}", port.index),
            _ => String::new(),
        };
        let mut visited = self.visited.borrow_mut();
        if visited.contains(&node) {
            *self.is_backref.borrow_mut() = true;
            write!(f, "{node}{port} → (see above)")
        } else {
            visited.insert(node);
            write!(f, "{node}{port} {}", format_node(self.graph, node))
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let children = match self.node {
            None => self.graph.sinks().into_iter().map(|sink| self.child(sink, None)).collect(),
            Some(node) => self
                .graph
                .node(node)
                .inputs()
                .iter()
                .filter_map(|input| input.connection())
                .map(|output| self.child(output.node, Some(output)))
                .collect(),
        };
        Cow::Owned(children)
    }
}

/// Output format: `KIND(detail) : type`
fn format_node(graph: &ProgramGraph, id: NodeId) -> String {
    let node = graph.node(id);
    let kind = match node.kind() {
        NodeKind::Constant(value) => format!("CONST({value})"),
        NodeKind::Array => format!("ARRAY(len={})", node.inputs().len()),
        NodeKind::NativeModuleCall(call) => {
            let effects = if call.has_side_effects { ", side-effects" } else { "" };
            format!("CALL({}, {}x{effects})", call.module.name, call.upsample_factor)
        }
        NodeKind::GraphInput => "GRAPH_INPUT".to_string(),
        NodeKind::GraphOutput => "GRAPH_OUTPUT".to_string(),
        NodeKind::Struct => "STRUCT".to_string(),
    };
    let types: Vec<String> = node.outputs().iter().map(|o| o.data_type().to_string()).collect();
    let remain_active = if graph.is_remain_active(id) { " remain-active" } else { "" };
    match types.as_slice() {
        [] => format!("{kind}{remain_active}"),
        [single] => format!("{kind} : {single}{remain_active}"),
        many => format!("{kind} : ({}){remain_active}", many.join(", ")),
    }
}

impl ProgramGraph {
    /// Render the graph as an ASCII tree rooted at its sinks.
    pub fn tree(&self) -> String {
        let tree = ProgramGraphTree::new(self);
        let mut buf = Vec::new();
        ptree::write_tree(&tree, &mut buf).expect("tree rendering failed");
        String::from_utf8(buf).expect("invalid utf8 in tree")
    }
}
