//! Reachability pruning and deduplication.

use sona_ir::test::helpers::*;
use sona_ir::ProgramGraph;
use test_case::test_case;

use crate::guard::fingerprint;
use crate::simplify::{SimplifyStats, simplify_graph};

#[test]
fn test_unreachable_nodes_are_pruned() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let used = call(&mut graph, &lib.negate, &[x]);
    let out = graph_output(&mut graph, used.output(0));
    let c = constant(&mut graph, 2.0);
    let dangling = call(&mut graph, &lib.add, &[x, c]);
    let dangling_tail = call(&mut graph, &lib.delay, &[dangling.output(0)]);

    let stats = simplify_graph(&mut graph);

    assert_eq!(stats, SimplifyStats { pruned: 3, merged: 0 });
    for id in [dangling, dangling_tail, c.node] {
        assert!(graph.is_removed(id));
    }
    assert_eq!(graph.consumers(x), &[used.input(0)]);
    assert!(!graph.is_removed(out));
    assert_connections_mirror(&graph);
}

#[test]
fn test_remain_active_nodes_are_kept() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let kept = call(&mut graph, &lib.delay, &[x]);
    graph.mark_remain_active(kept);

    assert_eq!(simplify_graph(&mut graph).pruned, 0);
    assert!(!graph.is_removed(kept));
}

#[test_case(2)]
#[test_case(5)]
fn test_identical_pure_subgraphs_collapse(copies: usize) {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let outputs: Vec<_> = (0..copies)
        .map(|_| {
            let c = constant(&mut graph, 0.5);
            let m = call(&mut graph, &lib.multiply, &[x, c]);
            let n = call(&mut graph, &lib.negate, &[m.output(0)]);
            graph_output(&mut graph, n.output(0))
        })
        .collect();

    let stats = simplify_graph(&mut graph);

    assert_eq!(stats.merged, 3 * (copies - 1));
    let sources: Vec<_> = outputs.iter().map(|o| graph.connection(o.input(0)).unwrap()).collect();
    assert!(sources.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(graph.live_node_count(), 1 + 3 + copies);
    assert_connections_mirror(&graph);
}

#[test]
fn test_identical_side_effecting_calls_stay_distinct() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let probes: Vec<_> = (0..3).map(|_| call(&mut graph, &lib.probe, &[x])).collect();

    let stats = simplify_graph(&mut graph);

    assert_eq!(stats.merged, 0);
    assert!(probes.iter().all(|&p| !graph.is_removed(p)));
}

#[test]
fn test_side_effecting_inputs_block_downstream_merging() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let p1 = call(&mut graph, &lib.probe, &[x]);
    let p2 = call(&mut graph, &lib.probe, &[x]);
    let n1 = call(&mut graph, &lib.negate, &[p1.output(0)]);
    let n2 = call(&mut graph, &lib.negate, &[p2.output(0)]);
    graph_output(&mut graph, n1.output(0));
    graph_output(&mut graph, n2.output(0));

    assert_eq!(simplify_graph(&mut graph).merged, 0);
}

#[test]
fn test_graph_inputs_only_equal_themselves() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let a = graph_input(&mut graph);
    let b = graph_input(&mut graph);
    let na = call(&mut graph, &lib.negate, &[a]);
    let nb = call(&mut graph, &lib.negate, &[b]);
    graph_output(&mut graph, na.output(0));
    graph_output(&mut graph, nb.output(0));

    assert_eq!(simplify_graph(&mut graph).merged, 0);
}

#[test_case(0.0, -0.0, 0; "signed zeros differ")]
#[test_case(1.0, 1.0, 1; "equal doubles merge")]
#[test_case(1.0, 2.0, 0; "different doubles")]
fn test_constant_merging(a: f64, b: f64, merged: usize) {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let ca = constant(&mut graph, a);
    let cb = constant(&mut graph, b);
    let add = call(&mut graph, &lib.add, &[ca, cb]);
    graph_output(&mut graph, add.output(0));

    assert_eq!(simplify_graph(&mut graph).merged, merged);
}

#[test]
fn test_constants_of_different_types_stay_apart() {
    let mut graph = ProgramGraph::new();
    let int = graph.add_constant(sona_dtype::Value::Int(1));
    let double = graph.add_constant(sona_dtype::Value::Double(1.0));
    graph_output(&mut graph, int.output(0));
    graph_output(&mut graph, double.output(0));

    assert_eq!(simplify_graph(&mut graph).merged, 0);
}

#[test]
fn test_calls_at_different_upsample_factors_stay_apart() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let a = call_at(&mut graph, &lib.negate, 1, &[x]);
    let b = call_at(&mut graph, &lib.negate, 2, &[x]);
    graph_output(&mut graph, a.output(0));
    graph_output(&mut graph, b.output(0));

    assert_eq!(simplify_graph(&mut graph).merged, 0);
}

#[test]
fn test_remain_active_moves_to_the_kept_node() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let a = call(&mut graph, &lib.delay, &[x]);
    let out = graph_output(&mut graph, a.output(0));
    let b = call(&mut graph, &lib.delay, &[x]);
    graph.mark_remain_active(b);

    assert_eq!(simplify_graph(&mut graph).merged, 1);
    assert!(graph.is_removed(b));
    assert!(graph.is_remain_active(a));
    assert_eq!(graph.sinks(), vec![a, out]);
}

#[test]
fn test_second_pass_is_a_noop() {
    let lib = TestLibrary::new();
    let mut graph = ProgramGraph::new();
    let x = graph_input(&mut graph);
    let c1 = constant(&mut graph, 1.0);
    let c2 = constant(&mut graph, 1.0);
    let a = call(&mut graph, &lib.add, &[x, c1]);
    let b = call(&mut graph, &lib.add, &[x, c2]);
    let m = call(&mut graph, &lib.multiply, &[a.output(0), b.output(0)]);
    graph_output(&mut graph, m.output(0));
    constant(&mut graph, 9.0);

    assert!(!simplify_graph(&mut graph).is_noop());
    let shape = fingerprint(&graph);
    assert!(simplify_graph(&mut graph).is_noop());
    assert_eq!(fingerprint(&graph), shape);
}
