//! Trie-indexed multi-pattern matcher.
//!
//! # Index
//!
//! Rules are grouped by anchor (module identity and declared upsample factor).
//! Each group is a discrimination tree: a rule's input pattern is flattened
//! into the depth-first sequence of components sitting at its anchor's "in"
//! parameters, each component becoming one [`Edge`]. Array and call edges are
//! followed by the edges of their own elements or inputs. Every module
//! parameter count is fixed, so no complete sequence is a prefix of another,
//! and rules attached to a tree node are exactly the rules whose pattern
//! completes there.
//!
//! # Matching
//!
//! A match state is a tree position plus a stack of graph frames
//! `(node, next input)`. Stepping a state reads the next input of the top
//! frame and follows every tree edge that accepts the connected node; each
//! accepted edge yields its own cloned state, so a wildcard and a more
//! specific edge are explored independently rather than greedily.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use sona_dtype::ValueHash;
use sona_ir::{NativeModuleId, NodeId, NodeKind, OptimizationRule, OutputPortId, PatternComponent, ProgramGraph};

/// One matched pattern step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edge {
    Input { must_be_constant: bool },
    Constant(ValueHash),
    Array { element_count: usize },
    Call { module: NativeModuleId, upsample_factor: u32, output_index: usize },
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// Outgoing edges in rule insertion order.
    edges: Vec<(Edge, usize)>,
    /// Rules whose pattern completes here.
    rules: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    fn new() -> Self {
        Self { nodes: vec![TrieNode::default()] }
    }

    fn insert(&mut self, edges: Vec<Edge>, rule: usize) {
        let mut at = 0;
        for edge in edges {
            let existing = self.nodes[at].edges.iter().find(|(e, _)| *e == edge).map(|&(_, child)| child);
            at = match existing {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[at].edges.push((edge, child));
                    child
                }
            };
        }
        self.nodes[at].rules.push(rule);
    }
}

/// Anchor identity: module and the upsample factor the rule declares for it.
type RootKey = (NativeModuleId, u32);

/// A rule whose input pattern matched, and the factor scaling its declared upsample factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    pub rule: usize,
    pub multiplier: u32,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    next_input: usize,
}

#[derive(Debug, Clone)]
struct State {
    trie_node: usize,
    stack: SmallVec<[Frame; 8]>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleRecognizer {
    roots: BTreeMap<RootKey, Trie>,
}

impl RuleRecognizer {
    pub fn new(rules: &[OptimizationRule]) -> Self {
        let mut roots: BTreeMap<RootKey, Trie> = BTreeMap::new();
        for (index, rule) in rules.iter().enumerate() {
            let anchor = rule.anchor();
            let mut edges = Vec::new();
            for input in anchor.inputs() {
                flatten(input, &mut edges);
            }
            roots.entry((anchor.module.id, anchor.upsample_factor)).or_insert_with(Trie::new).insert(edges, index);
        }
        Self { roots }
    }

    /// Number of anchors with a tree.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Total tree nodes across all anchors.
    pub fn trie_node_count(&self) -> usize {
        self.roots.values().map(|t| t.nodes.len()).sum()
    }

    /// Every rule whose input pattern matches the graph rooted at `node`.
    ///
    /// Candidates are sorted and free of duplicates.
    pub fn candidates(&self, graph: &ProgramGraph, node: NodeId) -> Vec<Candidate> {
        let Some(call) = graph.node(node).as_native_module_call() else {
            return Vec::new();
        };
        let module = call.module.id;
        let mut candidates = Vec::new();
        for (&(_, declared), trie) in self.roots.range((module, 0)..=(module, u32::MAX)) {
            if call.upsample_factor % declared != 0 {
                continue;
            }
            let multiplier = call.upsample_factor / declared;
            explore(trie, graph, node, multiplier, &mut candidates);
        }
        candidates.sort_unstable();
        candidates.dedup();
        tracing::trace!(node = %node, module = %call.module.name, candidates = candidates.len(), "recognizer explored");
        candidates
    }
}

fn flatten(component: &PatternComponent, edges: &mut Vec<Edge>) {
    match component {
        PatternComponent::Input { must_be_constant, .. } => {
            edges.push(Edge::Input { must_be_constant: *must_be_constant });
        }
        PatternComponent::Constant(value) => edges.push(Edge::Constant(ValueHash(value.clone()))),
        PatternComponent::Array { elements, .. } => {
            edges.push(Edge::Array { element_count: elements.len() });
            for element in elements {
                flatten(element, edges);
            }
        }
        PatternComponent::NativeModuleCall(call) => {
            edges.push(Edge::Call {
                module: call.module.id,
                upsample_factor: call.upsample_factor,
                output_index: call.output_index,
            });
            for input in call.inputs() {
                flatten(input, edges);
            }
        }
        PatternComponent::InputReference(_) | PatternComponent::Output => {
            unreachable!("rule validation keeps references and markers out of input positions")
        }
    }
}

fn explore(trie: &Trie, graph: &ProgramGraph, anchor: NodeId, multiplier: u32, candidates: &mut Vec<Candidate>) {
    let mut states = vec![State { trie_node: 0, stack: SmallVec::from_elem(Frame { node: anchor, next_input: 0 }, 1) }];
    while let Some(mut state) = states.pop() {
        let tree_node = &trie.nodes[state.trie_node];
        candidates.extend(tree_node.rules.iter().map(|&rule| Candidate { rule, multiplier }));

        while let Some(top) = state.stack.last()
            && top.next_input == graph.node(top.node).inputs().len()
        {
            state.stack.pop();
        }
        let Some(top) = state.stack.last_mut() else {
            continue;
        };
        let input = top.node.input(top.next_input);
        top.next_input += 1;
        let Some(source) = graph.connection(input) else {
            continue;
        };

        // Reverse so the first edge is explored first.
        for (edge, child) in tree_node.edges.iter().rev() {
            if !accepts(edge, graph, source, multiplier) {
                continue;
            }
            let mut next = State { trie_node: *child, stack: state.stack.clone() };
            if matches!(edge, Edge::Array { .. } | Edge::Call { .. }) {
                next.stack.push(Frame { node: source.node, next_input: 0 });
            }
            states.push(next);
        }
    }
}

fn accepts(edge: &Edge, graph: &ProgramGraph, source: OutputPortId, multiplier: u32) -> bool {
    let node = graph.node(source.node);
    match edge {
        Edge::Input { must_be_constant: false } => true,
        Edge::Input { must_be_constant: true } => is_constant_like(graph, source.node),
        Edge::Constant(expected) => node.as_constant().is_some_and(|value| value.bit_eq(&expected.0)),
        Edge::Array { element_count } => node.is_array() && node.inputs().len() == *element_count,
        Edge::Call { module, upsample_factor, output_index } => node.as_native_module_call().is_some_and(|call| {
            call.module.id == *module
                && upsample_factor.checked_mul(multiplier) == Some(call.upsample_factor)
                && source.index == *output_index
        }),
    }
}

/// A constant, or an array whose every element is connected directly to a constant.
pub fn is_constant_like(graph: &ProgramGraph, node: NodeId) -> bool {
    let node = graph.node(node);
    match node.kind() {
        NodeKind::Constant(_) => true,
        NodeKind::Array => node.inputs().iter().all(|input| {
            input.connection().is_some_and(|source| matches!(graph.node(source.node).kind(), NodeKind::Constant(_)))
        }),
        _ => false,
    }
}
