//! Rule-driven optimizer for sona program graphs.
//!
//! # Module Organization
//!
//! - [`recognizer`] - Trie-indexed multi-pattern matcher
//! - [`comparer`] - Specificity ordering between matching rules
//! - [`depth`] - Per-module maximum pattern depth, bounding rescans
//! - [`index`] - Build-once bundle of the above, shared across runs
//! - [`applicator`] - Replacement construction, compile-time folding and rewiring
//! - [`walker`] - Breadth-first worklist with rewind
//! - [`guard`] - Cycle and growth detection
//! - [`simplify`] - Reachability pruning and deduplication
//! - [`optimizer`] - Orchestration of one sub-graph optimization
//! - [`config`] - Optimizer limits
//!
//! # Example
//!
//! ```ignore
//! let index = OptimizationRuleIndex::new(rules);
//! let optimizer = Optimizer::new(&index, &library, OptimizerConfig::from_env());
//! let mut diagnostics = DiagnosticCollector::new();
//! optimizer.optimize(&mut voice, GraphLabel::Voice, &mut diagnostics)?;
//! optimizer.optimize(&mut effect, GraphLabel::Effect, &mut diagnostics)?;
//! ```

pub mod applicator;
pub mod comparer;
pub mod config;
pub mod depth;
pub mod guard;
pub mod index;
pub mod optimizer;
pub mod recognizer;
pub mod simplify;
pub mod walker;


pub use applicator::{Application, apply_rule};
pub use comparer::{RuleComparer, Specificity};
pub use config::OptimizerConfig;
pub use depth::ComponentDepthTracker;
pub use guard::{CycleGuard, Fingerprint, fingerprint};
pub use index::{OptimizationRuleIndex, RuleMatch};
pub use optimizer::{OptimizationStats, Optimizer};
pub use recognizer::{Candidate, RuleRecognizer};
pub use simplify::{SimplifyStats, simplify_graph};
pub use walker::GraphWalker;
