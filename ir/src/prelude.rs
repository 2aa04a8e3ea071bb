//! Common imports for building and inspecting program graphs.
//!
//! ```rust,ignore
//! use sona_ir::prelude::*;
//! ```

pub use crate::graph::{GraphLabel, InputPortId, NodeId, NodeKind, OutputPortId, ProgramGraph};
pub use crate::native::{NativeLibrary, NativeLibraryRegistry, NativeModule, NativeModuleId, NativeModuleParameter};
pub use crate::rule::{CaptureId, OptimizationRule, PatternComponent};

pub use sona_dtype::{DataType, PrimitiveType, Value};
