use proptest::prelude::*;

use crate::test::helpers::{TestLibrary, assert_connections_mirror};
use crate::test::property::generators::arb_graph_recipe;

proptest! {
    #[test]
    fn generated_graphs_keep_connections_mirrored(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let graph = recipe.build(&library);
        assert_connections_mirror(&graph);
    }

    #[test]
    fn reachable_set_is_closed_over_producers(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let graph = recipe.build(&library);
        let reachable = graph.reachable();
        for sink in graph.sinks() {
            prop_assert!(reachable.contains(&sink));
        }
        for &id in &reachable {
            for input in graph.node(id).inputs() {
                if let Some(source) = input.connection() {
                    prop_assert!(reachable.contains(&source.node));
                }
            }
        }
    }

    #[test]
    fn removing_dead_nodes_leaves_exactly_the_reachable_set(recipe in arb_graph_recipe(24)) {
        let library = TestLibrary::new();
        let mut graph = recipe.build(&library);
        let reachable = graph.reachable();
        let ids: Vec<_> = graph.nodes().map(|(id, _)| id).collect();
        for id in ids {
            if !graph.is_removed(id) {
                graph.remove_if_dead(id);
            }
        }
        assert_connections_mirror(&graph);
        let live: std::collections::BTreeSet<_> = graph.nodes().map(|(id, _)| id).collect();
        prop_assert_eq!(live, reachable);
        prop_assert_eq!(graph.live_node_count(), graph.reachable().len());
    }
}
