//! Diagnostics and the reporting capability.

use std::fmt;

/// Identifier attached to every reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::AsRefStr, strum::IntoStaticStr)]
pub enum DiagnosticId {
    TooManyNodes,
    OptimizationRuleCycle,
    NativeModuleInvocation,
    UnknownNativeModule,
}

/// Position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub location: Option<SourceLocation>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(id: DiagnosticId, message: impl Into<String>) -> Self {
        Self { id, location: None, message: message.into() }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}: {}", self.id, self.message),
            None => write!(f, "{}: {}", self.id, self.message),
        }
    }
}

/// Sink for diagnostics emitted by the compiler.
pub trait Reporting {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Reporter that keeps every diagnostic in memory and logs it.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has(&self, id: DiagnosticId) -> bool {
        self.diagnostics.iter().any(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Reporting for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::error!(id = %diagnostic.id, location = ?diagnostic.location, message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }
}
