use snafu::Snafu;

use crate::diagnostic::{Diagnostic, DiagnosticId};
use crate::graph::GraphLabel;
use crate::native::NativeModuleId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal conditions that abort the build.
///
/// Rule-authoring defects and broken graph invariants are not represented here;
/// they panic at the point of detection.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Rewriting grew the graph past the configured node threshold.
    #[snafu(display("{graph} graph grew to {node_count} nodes during optimization (threshold {threshold})"))]
    TooManyNodes { graph: GraphLabel, node_count: usize, threshold: usize },

    /// A graph fingerprint repeated, so the rewrite sequence can never terminate.
    #[snafu(display("optimization rules cycle in {graph} graph; last applied rule was '{rule}'"))]
    OptimizationRuleCycle { graph: GraphLabel, rule: String },

    /// Compile-time invocation of a native module failed.
    #[snafu(display("compile-time invocation of native module '{module}' failed: {message}"))]
    NativeModuleInvocation { module: String, message: String },

    #[snafu(display("native module {id} is not registered"))]
    UnknownNativeModule { id: NativeModuleId },
}

impl Error {
    /// Stable identifier reported alongside the message.
    pub fn diagnostic_id(&self) -> DiagnosticId {
        match self {
            Self::TooManyNodes { .. } => DiagnosticId::TooManyNodes,
            Self::OptimizationRuleCycle { .. } => DiagnosticId::OptimizationRuleCycle,
            Self::NativeModuleInvocation { .. } => DiagnosticId::NativeModuleInvocation,
            Self::UnknownNativeModule { .. } => DiagnosticId::UnknownNativeModule,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.diagnostic_id(), self.to_string())
    }
}
