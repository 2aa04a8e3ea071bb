//! Specificity ordering between rules matching the same node.
//!
//! Each rule is scored once by replaying its input pattern. Deeper and more
//! constrained patterns win; equal scores fall back to the rule name, so the
//! choice never depends on rule registration order.

use std::cmp::{Ordering, Reverse};

use sona_ir::{OptimizationRule, PatternComponent};

/// Pattern specificity, compared lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity {
    /// Longest chain of calls and leaves below and including the anchor.
    pub max_depth: u32,
    /// Constants matched by exact value.
    pub exact_matches: u32,
    /// Wildcards restricted to constant inputs.
    pub constant_constraints: u32,
}

impl Specificity {
    pub fn of(component: &PatternComponent) -> Self {
        match component {
            PatternComponent::NativeModuleCall(call) => {
                let children = Self::combine(call.inputs().map(Self::of));
                Self { max_depth: 1 + children.max_depth, ..children }
            }
            PatternComponent::Constant(_) => Self { max_depth: 1, exact_matches: 1, constant_constraints: 0 },
            PatternComponent::Array { elements, .. } => {
                let children = Self::combine(elements.iter().map(Self::of));
                Self { max_depth: children.max_depth.max(1), ..children }
            }
            PatternComponent::Input { must_be_constant, .. } => {
                Self { max_depth: 1, exact_matches: 0, constant_constraints: u32::from(*must_be_constant) }
            }
            PatternComponent::InputReference(_) | PatternComponent::Output => Self::default(),
        }
    }

    /// Deepest child depth with summed counts.
    fn combine(children: impl Iterator<Item = Self>) -> Self {
        children.fold(Self::default(), |acc, s| Self {
            max_depth: acc.max_depth.max(s.max_depth),
            exact_matches: acc.exact_matches + s.exact_matches,
            constant_constraints: acc.constant_constraints + s.constant_constraints,
        })
    }
}

/// Precomputed specificity of every rule in a database.
#[derive(Debug, Clone)]
pub struct RuleComparer {
    scores: Vec<Specificity>,
}

impl RuleComparer {
    pub fn new(rules: &[OptimizationRule]) -> Self {
        Self { scores: rules.iter().map(|r| Specificity::of(r.input_pattern())).collect() }
    }

    pub fn specificity(&self, rule: usize) -> Specificity {
        self.scores[rule]
    }

    /// Preference order: `Less` means `a` is preferred over `b`.
    pub fn compare(&self, rules: &[OptimizationRule], a: usize, b: usize) -> Ordering {
        let key = |i: usize| (Reverse(self.scores[i]), rules[i].name());
        key(a).cmp(&key(b))
    }

    /// The most specific of `candidates`.
    pub fn best(&self, rules: &[OptimizationRule], candidates: impl IntoIterator<Item = usize>) -> Option<usize> {
        candidates.into_iter().min_by(|&a, &b| self.compare(rules, a, b))
    }
}
