//! Intermediate representation consumed by the sona graph optimizer.
//!
//! # Module Organization
//!
//! - [`graph`] - Program graph: node arena, ports, connections, sinks, reachability
//! - [`native`] - Native module descriptions and the library registry capability
//! - [`rule`] - Optimization rules and the pattern components they are built from
//! - [`diagnostic`] - Diagnostic identifiers and the reporting capability
//! - [`error`] - Error types and result handling

pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod native;
pub mod prelude;
pub mod rule;


pub use diagnostic::{Diagnostic, DiagnosticCollector, DiagnosticId, Reporting, SourceLocation};
pub use error::{Error, Result};
pub use graph::{
    GraphLabel, InputPort, InputPortId, NativeModuleCall, NodeId, NodeKind, OutputPort, OutputPortId, ProcessorNode,
    ProgramGraph,
};
pub use native::{
    CompileTimeArgument, CompileTimeFn, NativeLibrary, NativeLibraryRegistry, NativeModule, NativeModuleId,
    NativeModuleParameter, ParameterDirection,
};
pub use rule::{CaptureId, NativeModuleCallPattern, OptimizationRule, PatternComponent};

pub use sona_dtype::{DataType, PrimitiveType, Value};
