//! Native module descriptions and the library registry capability.
//!
//! Native modules are the signal-processing primitives a program graph calls
//! into. The optimizer only needs their signatures, their side-effect flag and,
//! for constant folding, the ability to run them at compile time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use snafu::OptionExt;
use sona_dtype::{DataType, PrimitiveType, Value};

use crate::error::{Error, Result, UnknownNativeModuleSnafu};

/// Identity of a native module: the owning library and the module within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeModuleId {
    pub library: u32,
    pub module: u32,
}

impl NativeModuleId {
    pub const fn new(library: u32, module: u32) -> Self {
        Self { library, module }
    }
}

impl fmt::Display for NativeModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.library, self.module)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeModuleParameter {
    pub name: String,
    pub direction: ParameterDirection,
    pub primitive: PrimitiveType,
    pub is_array: bool,
}

impl NativeModuleParameter {
    pub fn input(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self { name: name.into(), direction: ParameterDirection::In, primitive, is_array: false }
    }

    pub fn output(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self { name: name.into(), direction: ParameterDirection::Out, primitive, is_array: false }
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn is_in(&self) -> bool {
        self.direction == ParameterDirection::In
    }

    pub fn is_out(&self) -> bool {
        self.direction == ParameterDirection::Out
    }

    /// Concrete type of this parameter when the call runs at `upsample_factor`.
    pub fn data_type(&self, upsample_factor: u32) -> DataType {
        let data_type = DataType::scalar(self.primitive).with_upsample_factor(upsample_factor);
        if self.is_array { data_type.as_array() } else { data_type }
    }
}

/// Argument passed to a compile-time invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileTimeArgument {
    Scalar(Value),
    Array(Vec<Value>),
}

impl CompileTimeArgument {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Array(_) => None,
        }
    }
}

/// Compile-time implementation of a native module.
///
/// Receives the upsample factor and one argument per "in" parameter, and
/// returns one value per "out" parameter.
pub type CompileTimeFn =
    Arc<dyn Fn(u32, &[CompileTimeArgument]) -> std::result::Result<Vec<Value>, String> + Send + Sync>;

pub struct NativeModule {
    pub id: NativeModuleId,
    pub name: String,
    pub parameters: Vec<NativeModuleParameter>,
    pub has_side_effects: bool,
    compile_time: Option<CompileTimeFn>,
}

impl NativeModule {
    pub fn new(id: NativeModuleId, name: impl Into<String>, parameters: Vec<NativeModuleParameter>) -> Self {
        Self { id, name: name.into(), parameters, has_side_effects: false, compile_time: None }
    }

    pub fn with_side_effects(mut self) -> Self {
        self.has_side_effects = true;
        self
    }

    pub fn with_compile_time<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &[CompileTimeArgument]) -> std::result::Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        self.compile_time = Some(Arc::new(f));
        self
    }

    /// Whether the module may be invoked at compile time for constant folding.
    pub fn supports_compile_time(&self) -> bool {
        self.compile_time.is_some() && !self.has_side_effects
    }

    pub fn in_parameters(&self) -> impl Iterator<Item = &NativeModuleParameter> {
        self.parameters.iter().filter(|p| p.is_in())
    }

    pub fn out_parameters(&self) -> impl Iterator<Item = &NativeModuleParameter> {
        self.parameters.iter().filter(|p| p.is_out())
    }

    pub fn in_count(&self) -> usize {
        self.in_parameters().count()
    }

    pub fn out_count(&self) -> usize {
        self.out_parameters().count()
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("has_side_effects", &self.has_side_effects)
            .field("compile_time", &self.compile_time.is_some())
            .finish()
    }
}

impl PartialEq for NativeModule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NativeModule {}

/// Capability to resolve native modules and run them at compile time.
pub trait NativeLibraryRegistry {
    fn module(&self, id: NativeModuleId) -> Option<Arc<NativeModule>>;

    fn resolve(&self, id: NativeModuleId) -> Result<Arc<NativeModule>> {
        self.module(id).context(UnknownNativeModuleSnafu { id })
    }

    /// Run `module` at compile time.
    ///
    /// Returns `Ok(None)` when the module cannot be folded, and one value per
    /// "out" parameter otherwise.
    fn invoke_compile_time(
        &self,
        module: &NativeModule,
        upsample_factor: u32,
        arguments: &[CompileTimeArgument],
    ) -> Result<Option<Vec<Value>>> {
        if !module.supports_compile_time() {
            return Ok(None);
        }
        let Some(f) = module.compile_time.as_ref() else {
            return Ok(None);
        };
        let values = f(upsample_factor, arguments)
            .map_err(|message| Error::NativeModuleInvocation { module: module.name.clone(), message })?;
        assert_eq!(
            values.len(),
            module.out_count(),
            "native module '{}' returned {} values for {} out parameters",
            module.name,
            values.len(),
            module.out_count()
        );
        Ok(Some(values))
    }
}

/// In-memory registry of native modules.
#[derive(Debug, Default)]
pub struct NativeLibrary {
    modules: BTreeMap<NativeModuleId, Arc<NativeModule>>,
}

impl NativeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any module with the same id.
    pub fn register(&mut self, module: NativeModule) -> Arc<NativeModule> {
        let module = Arc::new(module);
        self.modules.insert(module.id, Arc::clone(&module));
        module
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NativeModule>> {
        self.modules.values()
    }
}

impl NativeLibraryRegistry for NativeLibrary {
    fn module(&self, id: NativeModuleId) -> Option<Arc<NativeModule>> {
        self.modules.get(&id).cloned()
    }
}
