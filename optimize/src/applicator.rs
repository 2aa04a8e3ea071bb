//! Instantiation of a matched rule's replacement subgraphs.

use std::collections::{BTreeMap, BTreeSet};

use sona_dtype::{DataType, Value};
use sona_ir::{
    CaptureId, CompileTimeArgument, NativeLibraryRegistry, NativeModuleCallPattern, NodeId, NodeKind,
    OptimizationRule, OutputPortId, PatternComponent, ProgramGraph, Result,
};

/// Outcome of applying a rule.
#[derive(Debug, Clone, Default)]
pub struct Application {
    /// `(old, new)` output pairs in output pattern order. Index 0 is the anchor's output.
    pub replaced: Vec<(OutputPortId, OutputPortId)>,
    /// Nodes created by the replacement that are still live.
    pub created: Vec<NodeId>,
}

/// Bindings recorded by re-walking an input pattern against a matched node.
#[derive(Debug, Default)]
struct Bindings {
    captures: BTreeMap<CaptureId, OutputPortId>,
    /// Old outputs aligned with the rule's output patterns.
    outputs: Vec<OutputPortId>,
}

impl Bindings {
    fn bind(rule: &OptimizationRule, graph: &ProgramGraph, anchor: NodeId) -> Self {
        let pattern = rule.anchor();
        let mut bindings = Self { outputs: vec![anchor.output(pattern.output_index)], ..Self::default() };
        bindings.bind_call(graph, pattern, anchor);
        assert_eq!(
            bindings.outputs.len(),
            rule.output_patterns().len(),
            "rule '{}' binds {} outputs for {} output patterns",
            rule.name(),
            bindings.outputs.len(),
            rule.output_patterns().len()
        );
        bindings
    }

    fn bind_call(&mut self, graph: &ProgramGraph, pattern: &NativeModuleCallPattern, node: NodeId) {
        let mut input_index = 0;
        let mut output_index = 0;
        for (parameter, component) in pattern.module.parameters.iter().zip(&pattern.parameters) {
            if parameter.is_out() {
                if output_index != pattern.output_index {
                    self.outputs.push(node.output(output_index));
                }
                output_index += 1;
                continue;
            }
            let Some(source) = graph.connection(node.input(input_index)) else {
                panic!("matched call {node} has unconnected input {input_index}");
            };
            self.bind_component(graph, component, source);
            input_index += 1;
        }
    }

    fn bind_component(&mut self, graph: &ProgramGraph, component: &PatternComponent, source: OutputPortId) {
        match component {
            PatternComponent::NativeModuleCall(call) => self.bind_call(graph, call, source.node),
            PatternComponent::Constant(_) => {}
            PatternComponent::Array { capture, elements } => {
                if let Some(id) = capture {
                    self.captures.insert(*id, source);
                }
                let array = graph.node(source.node);
                assert_eq!(
                    array.inputs().len(),
                    elements.len(),
                    "matched array {} has {} elements, pattern has {}",
                    source.node,
                    array.inputs().len(),
                    elements.len()
                );
                for (index, element) in elements.iter().enumerate() {
                    let Some(element_source) = array.input_connection(index) else {
                        panic!("matched array {} has unconnected element {index}", source.node);
                    };
                    self.bind_component(graph, element, element_source);
                }
            }
            PatternComponent::Input { capture, .. } => {
                self.captures.insert(*capture, source);
            }
            PatternComponent::InputReference(_) | PatternComponent::Output => {
                unreachable!("rule validation keeps references and markers out of input positions")
            }
        }
    }
}

struct Builder<'a, R: ?Sized> {
    graph: &'a mut ProgramGraph,
    registry: &'a R,
    captures: &'a BTreeMap<CaptureId, OutputPortId>,
    multiplier: u32,
    created: BTreeSet<NodeId>,
}

impl<R: NativeLibraryRegistry + ?Sized> Builder<'_, R> {
    fn build(&mut self, component: &PatternComponent, expected: DataType) -> Result<OutputPortId> {
        match component {
            PatternComponent::InputReference(id) => Ok(self.captures[id]),
            PatternComponent::Constant(value) => Ok(self.constant(value.clone())),
            PatternComponent::Array { elements, .. } => {
                let element_type = expected.element();
                let mut sources = Vec::with_capacity(elements.len());
                for element in elements {
                    sources.push(self.build(element, element_type)?);
                }
                let array = self.graph.add_array(expected, sources.len());
                self.created.insert(array);
                for (index, source) in sources.into_iter().enumerate() {
                    self.graph.connect(array.input(index), source);
                }
                Ok(array.output(0))
            }
            PatternComponent::NativeModuleCall(call) => self.build_call(call),
            PatternComponent::Input { .. } | PatternComponent::Output => {
                unreachable!("rule validation keeps wildcards and markers out of output patterns")
            }
        }
    }

    fn build_call(&mut self, pattern: &NativeModuleCallPattern) -> Result<OutputPortId> {
        let module = &pattern.module;
        let Some(upsample_factor) = pattern.upsample_factor.checked_mul(self.multiplier) else {
            panic!(
                "upsample factor {} of '{}' overflows when scaled by {}",
                pattern.upsample_factor, module.name, self.multiplier
            );
        };

        let mut sources = Vec::with_capacity(module.in_count());
        for (parameter, component) in module.parameters.iter().zip(&pattern.parameters) {
            if parameter.is_in() {
                sources.push(self.build(component, parameter.data_type(upsample_factor))?);
            }
        }

        if let Some(arguments) = self.compile_time_arguments(&sources)
            && let Some(mut values) = self.registry.invoke_compile_time(module, upsample_factor, &arguments)?
        {
            let value = values.swap_remove(pattern.output_index);
            let folded = self.constant(value);
            self.release(&sources);
            tracing::trace!(module = %module.name, node = %folded.node, "folded call at compile time");
            return Ok(folded);
        }

        let call = self.graph.add_native_module_call(module, upsample_factor, 0);
        self.created.insert(call);
        for (index, source) in sources.into_iter().enumerate() {
            self.graph.connect(call.input(index), source);
        }
        Ok(call.output(pattern.output_index))
    }

    fn constant(&mut self, value: Value) -> OutputPortId {
        let node = self.graph.add_constant(value);
        self.created.insert(node);
        node.output(0)
    }

    /// Arguments for a compile-time call, if every source is a constant or an array of constants.
    fn compile_time_arguments(&self, sources: &[OutputPortId]) -> Option<Vec<CompileTimeArgument>> {
        sources
            .iter()
            .map(|source| {
                let node = self.graph.node(source.node);
                match node.kind() {
                    NodeKind::Constant(value) => Some(CompileTimeArgument::Scalar(value.clone())),
                    NodeKind::Array => node
                        .inputs()
                        .iter()
                        .map(|input| {
                            let element = input.connection()?;
                            self.graph.node(element.node).as_constant().cloned()
                        })
                        .collect::<Option<Vec<_>>>()
                        .map(CompileTimeArgument::Array),
                    _ => None,
                }
            })
            .collect()
    }

    /// Drop freshly built argument nodes nothing consumes after folding.
    fn release(&mut self, sources: &[OutputPortId]) {
        for source in sources {
            if self.created.contains(&source.node) {
                self.graph.remove_if_dead(source.node);
            }
        }
    }
}

/// Replace the subgraph matched by `rule` at `anchor` with the rule's output patterns.
///
/// Every downstream connection of each old output moves onto the matching new
/// output, except connections from nodes the replacement itself created. The
/// anchor and whatever it alone kept alive are then removed. A remain-active
/// mark on a replaced node moves to the node producing its replacement.
///
/// # Errors
///
/// Returns an error when compile-time invocation of a folded call fails.
pub fn apply_rule<R: NativeLibraryRegistry + ?Sized>(
    graph: &mut ProgramGraph,
    registry: &R,
    rule: &OptimizationRule,
    anchor: NodeId,
    multiplier: u32,
) -> Result<Application> {
    let bindings = Bindings::bind(rule, graph, anchor);

    let mut builder =
        Builder { graph: &mut *graph, registry, captures: &bindings.captures, multiplier, created: BTreeSet::new() };
    let mut replaced = Vec::with_capacity(bindings.outputs.len());
    for (&old, pattern) in bindings.outputs.iter().zip(rule.output_patterns()) {
        let expected = builder.graph.output(old).data_type();
        let new = builder.build(pattern, expected)?;
        replaced.push((old, new));
    }
    let created = builder.created;

    for &(old, new) in &replaced {
        graph.redirect_consumers(old, new, |consumer| created.contains(&consumer.node));
    }
    // Remain-active marks move to the nodes now producing the replaced values.
    let kept_active: Vec<NodeId> = replaced
        .iter()
        .filter(|(old, new)| old.node != new.node && graph.is_remain_active(old.node))
        .map(|(_, new)| new.node)
        .collect();
    for &(old, _) in &replaced {
        graph.unmark_remain_active(old.node);
    }
    for node in kept_active {
        graph.mark_remain_active(node);
    }
    for &(old, _) in &replaced {
        if !graph.is_removed(old.node) {
            graph.remove_if_dead(old.node);
        }
    }
    // Replacement nodes no pair ended up using.
    for &node in &created {
        if !graph.is_removed(node) {
            graph.remove_if_dead(node);
        }
    }

    let created = created.into_iter().filter(|&node| !graph.is_removed(node)).collect();
    Ok(Application { replaced, created })
}
