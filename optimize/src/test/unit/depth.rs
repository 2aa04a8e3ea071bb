use sona_ir::test::helpers::TestLibrary;
use sona_ir::{OptimizationRule, PatternComponent as P};

use crate::depth::ComponentDepthTracker;

#[test]
fn test_depths_take_the_maximum_across_rules() {
    let lib = TestLibrary::new();
    let rules = vec![
        // negate at 0 and 1, delay at 2
        OptimizationRule::new(
            "deep",
            P::call(&lib.negate, vec![P::call(&lib.negate, vec![P::call(&lib.delay, vec![P::input(0)])])]),
            vec![P::reference(0)],
        ),
        // add at 0, delay at 1
        OptimizationRule::new(
            "shallow",
            P::call(&lib.add, vec![P::call(&lib.delay, vec![P::input(0)]), P::input(1)]),
            vec![P::reference(1)],
        ),
    ];
    let tracker = ComponentDepthTracker::new(&rules);

    assert_eq!(tracker.depth(lib.negate.id), 1);
    assert_eq!(tracker.depth(lib.delay.id), 2);
    assert_eq!(tracker.depth(lib.add.id), 0);
    assert_eq!(tracker.len(), 3);
}

#[test]
fn test_arrays_do_not_add_depth() {
    let lib = TestLibrary::new();
    let rules = vec![OptimizationRule::new(
        "sum_of_negations",
        P::call(&lib.sum, vec![P::array(vec![P::call(&lib.negate, vec![P::input(0)]), P::input(1)])]),
        vec![P::reference(1)],
    )];
    let tracker = ComponentDepthTracker::new(&rules);

    assert_eq!(tracker.depth(lib.sum.id), 0);
    assert_eq!(tracker.depth(lib.negate.id), 1);
}

#[test]
fn test_output_patterns_are_ignored() {
    let lib = TestLibrary::new();
    let rules = vec![OptimizationRule::new(
        "expand",
        P::call(&lib.negate, vec![P::input(0)]),
        vec![P::call(&lib.multiply, vec![P::reference(0), P::constant(-1.0)])],
    )];
    let tracker = ComponentDepthTracker::new(&rules);

    assert_eq!(tracker.depth(lib.multiply.id), 0);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_unknown_module_has_depth_zero() {
    let lib = TestLibrary::new();
    let tracker = ComponentDepthTracker::new(&[]);
    assert!(tracker.is_empty());
    assert_eq!(tracker.depth(lib.probe.id), 0);
}
