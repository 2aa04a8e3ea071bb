use proptest::prelude::*;

use sona_ir::test::helpers::{TestLibrary, assert_connections_mirror};
use sona_ir::test::property::generators::arb_graph_recipe;

use crate::guard::fingerprint;
use crate::simplify::simplify_graph;
use crate::test::helpers::{algebra_rules, optimize_with};
use crate::OptimizerConfig;

proptest! {
    #[test]
    fn simplify_is_idempotent(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let mut graph = recipe.build(&library);
        simplify_graph(&mut graph);
        let tree = graph.tree();
        let before = fingerprint(&graph);

        let second = simplify_graph(&mut graph);

        prop_assert!(second.is_noop(), "{second:?}");
        prop_assert_eq!(fingerprint(&graph), before);
        prop_assert_eq!(graph.tree(), tree);
    }

    #[test]
    fn simplified_graphs_hold_only_reachable_nodes(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let mut graph = recipe.build(&library);
        let sinks = graph.sinks();
        simplify_graph(&mut graph);

        let reachable = graph.reachable();
        prop_assert_eq!(reachable.len(), graph.live_node_count());
        for sink in sinks {
            prop_assert!(!graph.is_removed(sink));
        }
        assert_connections_mirror(&graph);
    }

    #[test]
    fn optimization_is_deterministic(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let mut first = recipe.build(&library);
        let mut second = recipe.build(&library);

        let (first_stats, _) = optimize_with(algebra_rules(&library), &library, &mut first, OptimizerConfig::default());
        let (second_stats, _) = optimize_with(algebra_rules(&library), &library, &mut second, OptimizerConfig::default());

        prop_assert_eq!(first_stats.unwrap(), second_stats.unwrap());
        prop_assert_eq!(first.tree(), second.tree());
    }

    #[test]
    fn shrinking_rules_never_grow_the_graph(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let mut graph = recipe.build(&library);
        let sinks = graph.sinks();

        let (result, diagnostics) = optimize_with(algebra_rules(&library), &library, &mut graph, OptimizerConfig::default());
        let stats = result.unwrap();

        prop_assert!(diagnostics.is_empty());
        prop_assert!(stats.nodes_after <= stats.nodes_before);
        prop_assert_eq!(stats.nodes_after, graph.live_node_count());
        prop_assert_eq!(stats.applied, stats.rules.values().sum::<usize>());
        // Sinks are never rewritten away.
        for sink in sinks {
            prop_assert!(!graph.is_removed(sink));
        }
        assert_connections_mirror(&graph);
    }
}
