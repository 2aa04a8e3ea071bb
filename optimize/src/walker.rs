//! Breadth-first worklist over the live graph with rewind support.

use std::collections::HashMap;

use sona_ir::{NodeId, ProgramGraph};

/// Worklist seeded from the sinks at depth 0.
///
/// Visiting a node enqueues each not yet queued producer one level deeper,
/// except that array elements share their array's depth. Removed nodes are
/// skipped when popped.
#[derive(Debug, Clone, Default)]
pub struct GraphWalker {
    queue: Vec<(NodeId, usize)>,
    cursor: usize,
    /// Depth of every node currently in `queue`.
    depths: HashMap<NodeId, usize>,
}

impl GraphWalker {
    pub fn new(graph: &ProgramGraph) -> Self {
        let mut walker = Self::default();
        for sink in graph.sinks() {
            walker.enqueue(sink, 0);
        }
        walker
    }

    fn enqueue(&mut self, node: NodeId, depth: usize) {
        if self.depths.contains_key(&node) {
            return;
        }
        self.depths.insert(node, depth);
        self.queue.push((node, depth));
    }

    /// Queue a node that became a sink after the walk started.
    pub fn push_sink(&mut self, node: NodeId) {
        self.enqueue(node, 0);
    }

    /// Next live node and its depth, enqueueing its producers.
    pub fn next(&mut self, graph: &ProgramGraph) -> Option<(NodeId, usize)> {
        while let Some(&(node, depth)) = self.queue.get(self.cursor) {
            self.cursor += 1;
            if graph.is_removed(node) {
                continue;
            }
            let processor = graph.node(node);
            let producer_depth = if processor.is_array() { depth } else { depth + 1 };
            for input in processor.inputs() {
                if let Some(source) = input.connection() {
                    self.enqueue(source.node, producer_depth);
                }
            }
            return Some((node, depth));
        }
        None
    }

    /// Depth at which `node` is queued, if it is.
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        self.depths.get(&node).copied()
    }

    /// Forget everything queued deeper than `depth` and resume at the first node at `depth`.
    pub fn rewind(&mut self, depth: usize) {
        let mut kept_before_cursor = 0;
        let mut index = 0;
        let cursor = self.cursor;
        let depths = &mut self.depths;
        self.queue.retain(|&(node, d)| {
            let keep = d <= depth;
            if keep {
                if index < cursor {
                    kept_before_cursor += 1;
                }
            } else {
                depths.remove(&node);
            }
            index += 1;
            keep
        });
        let first_at_depth = self.queue.iter().position(|&(_, d)| d == depth).unwrap_or(self.queue.len());
        self.cursor = first_at_depth.min(kept_before_cursor);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
