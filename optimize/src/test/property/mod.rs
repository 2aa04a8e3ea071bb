//! Property-based tests for simplification and optimization.

mod optimizer_props;
