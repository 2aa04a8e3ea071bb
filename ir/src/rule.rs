//! Optimization rules: declarative pattern/replacement pairs.
//!
//! A rule's input pattern is a tree of [`PatternComponent`]s rooted at a
//! native module call (the anchor). Its output patterns describe the
//! subgraphs that replace the matched outputs.
//!
//! # Example
//!
//! ```ignore
//! // negate(negate(x)) => x
//! let rule = OptimizationRule::new(
//!     "double_negation",
//!     PatternComponent::call(&negate, vec![PatternComponent::call(&negate, vec![PatternComponent::input(0)])]),
//!     vec![PatternComponent::reference(0)],
//! );
//! ```
//!
//! Rules are authored once per native library; [`OptimizationRule::new`]
//! asserts the authoring contract.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use sona_dtype::Value;

use crate::native::NativeModule;

/// Identifier binding a captured [`PatternComponent::Input`] or array to later references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(pub u16);

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Call component: matches, or builds, a call of `module`.
#[derive(Debug, Clone)]
pub struct NativeModuleCallPattern {
    pub module: Arc<NativeModule>,
    /// Declared factor; a match at a multiple of it scales every nested call alike.
    pub upsample_factor: u32,
    /// Which "out" parameter of the call the parent consumes.
    pub output_index: usize,
    /// One component per module parameter, "out" positions holding [`PatternComponent::Output`].
    pub parameters: Vec<PatternComponent>,
}

impl NativeModuleCallPattern {
    /// Components at "in" parameter positions, in parameter order.
    pub fn inputs(&self) -> impl Iterator<Item = &PatternComponent> {
        self.module.parameters.iter().zip(&self.parameters).filter(|(p, _)| p.is_in()).map(|(_, c)| c)
    }
}

#[derive(Debug, Clone)]
pub enum PatternComponent {
    NativeModuleCall(NativeModuleCallPattern),
    Constant(Value),
    Array { capture: Option<CaptureId>, elements: Vec<PatternComponent> },
    /// Wildcard. Optionally restricted to constants or arrays of constants.
    Input { capture: CaptureId, must_be_constant: bool },
    /// Port captured by the input pattern. Output patterns only.
    InputReference(CaptureId),
    /// Placeholder at an "out" parameter position.
    Output,
}

impl PatternComponent {
    /// Call at factor 1 consuming output 0; `inputs` fill the "in" parameters in order.
    pub fn call(module: &Arc<NativeModule>, inputs: Vec<PatternComponent>) -> Self {
        Self::call_with(module, 1, 0, inputs)
    }

    pub fn call_with(
        module: &Arc<NativeModule>,
        upsample_factor: u32,
        output_index: usize,
        inputs: Vec<PatternComponent>,
    ) -> Self {
        assert_eq!(
            inputs.len(),
            module.in_count(),
            "pattern for '{}' needs {} inputs, got {}",
            module.name,
            module.in_count(),
            inputs.len()
        );
        let mut inputs = inputs.into_iter();
        let parameters = module
            .parameters
            .iter()
            .map(|p| if p.is_in() { inputs.next().unwrap_or(Self::Output) } else { Self::Output })
            .collect();
        Self::NativeModuleCall(NativeModuleCallPattern {
            module: Arc::clone(module),
            upsample_factor,
            output_index,
            parameters,
        })
    }

    pub fn input(capture: u16) -> Self {
        Self::Input { capture: CaptureId(capture), must_be_constant: false }
    }

    pub fn constant_input(capture: u16) -> Self {
        Self::Input { capture: CaptureId(capture), must_be_constant: true }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn array(elements: Vec<PatternComponent>) -> Self {
        Self::Array { capture: None, elements }
    }

    pub fn captured_array(capture: u16, elements: Vec<PatternComponent>) -> Self {
        Self::Array { capture: Some(CaptureId(capture)), elements }
    }

    pub fn reference(capture: u16) -> Self {
        Self::InputReference(CaptureId(capture))
    }

    pub fn output() -> Self {
        Self::Output
    }

    pub fn as_native_module_call(&self) -> Option<&NativeModuleCallPattern> {
        match self {
            Self::NativeModuleCall(call) => Some(call),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationRule {
    name: String,
    input_pattern: PatternComponent,
    output_patterns: Vec<PatternComponent>,
}

impl OptimizationRule {
    /// Create a rule, asserting that it is well formed.
    ///
    /// # Panics
    ///
    /// Panics if the input pattern is not rooted at a call, if a call pattern
    /// does not have one component per module parameter, if `Output` appears
    /// anywhere but an "out" parameter position, if a capture id is bound twice
    /// or referenced without being bound, or if the number of output patterns
    /// differs from one plus the number of Output markers the input pattern
    /// leaves unconsumed.
    pub fn new(name: impl Into<String>, input_pattern: PatternComponent, output_patterns: Vec<PatternComponent>) -> Self {
        let name = name.into();
        assert!(
            matches!(input_pattern, PatternComponent::NativeModuleCall(_)),
            "rule '{name}': input pattern must be rooted at a native module call"
        );

        let mut captures = BTreeSet::new();
        let mut unconsumed = 0;
        validate_input(&name, &input_pattern, &mut captures, &mut unconsumed);
        assert_eq!(
            output_patterns.len(),
            1 + unconsumed,
            "rule '{name}': expected {} output patterns, got {}",
            1 + unconsumed,
            output_patterns.len()
        );
        for pattern in &output_patterns {
            assert!(!matches!(pattern, PatternComponent::Output), "rule '{name}': output pattern cannot be an Output marker");
            validate_output(&name, pattern, &captures);
        }

        Self { name, input_pattern, output_patterns }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_pattern(&self) -> &PatternComponent {
        &self.input_pattern
    }

    pub fn output_patterns(&self) -> &[PatternComponent] {
        &self.output_patterns
    }

    /// The call component at the root of the input pattern.
    pub fn anchor(&self) -> &NativeModuleCallPattern {
        match &self.input_pattern {
            PatternComponent::NativeModuleCall(call) => call,
            _ => unreachable!("validated in OptimizationRule::new"),
        }
    }
}

fn validate_call(rule: &str, call: &NativeModuleCallPattern) {
    let module = &call.module;
    assert!(call.upsample_factor > 0, "rule '{rule}': call to '{}' has upsample factor 0", module.name);
    assert_eq!(
        call.parameters.len(),
        module.parameters.len(),
        "rule '{rule}': call to '{}' needs {} parameter components, got {}",
        module.name,
        module.parameters.len(),
        call.parameters.len()
    );
    assert!(
        call.output_index < module.out_count(),
        "rule '{rule}': call to '{}' consumes output {} of {}",
        module.name,
        call.output_index,
        module.out_count()
    );
    for (parameter, component) in module.parameters.iter().zip(&call.parameters) {
        assert_eq!(
            parameter.is_out(),
            matches!(component, PatternComponent::Output),
            "rule '{rule}': parameter '{}' of '{}' must {}be an Output marker",
            parameter.name,
            module.name,
            if parameter.is_out() { "" } else { "not " }
        );
    }
}

fn validate_input(rule: &str, component: &PatternComponent, captures: &mut BTreeSet<CaptureId>, unconsumed: &mut usize) {
    match component {
        PatternComponent::NativeModuleCall(call) => {
            validate_call(rule, call);
            *unconsumed += call.module.out_count() - 1;
            for input in call.inputs() {
                validate_input(rule, input, captures, unconsumed);
            }
        }
        PatternComponent::Constant(_) => {}
        PatternComponent::Array { capture, elements } => {
            if let Some(id) = capture {
                assert!(captures.insert(*id), "rule '{rule}': capture {id} is bound twice");
            }
            for element in elements {
                validate_input(rule, element, captures, unconsumed);
            }
        }
        PatternComponent::Input { capture, .. } => {
            assert!(captures.insert(*capture), "rule '{rule}': capture {capture} is bound twice");
        }
        PatternComponent::InputReference(id) => {
            panic!("rule '{rule}': input reference {id} inside the input pattern")
        }
        PatternComponent::Output => panic!("rule '{rule}': Output marker outside an out parameter position"),
    }
}

fn validate_output(rule: &str, component: &PatternComponent, captures: &BTreeSet<CaptureId>) {
    match component {
        PatternComponent::NativeModuleCall(call) => {
            validate_call(rule, call);
            for input in call.inputs() {
                validate_output(rule, input, captures);
            }
        }
        PatternComponent::Constant(_) => {}
        PatternComponent::Array { capture, elements } => {
            assert!(capture.is_none(), "rule '{rule}': arrays in output patterns cannot capture");
            for element in elements {
                validate_output(rule, element, captures);
            }
        }
        PatternComponent::Input { capture, .. } => {
            panic!("rule '{rule}': wildcard {capture} inside an output pattern")
        }
        PatternComponent::InputReference(id) => {
            assert!(captures.contains(id), "rule '{rule}': reference to unbound capture {id}")
        }
        PatternComponent::Output => panic!("rule '{rule}': Output marker outside an out parameter position"),
    }
}
