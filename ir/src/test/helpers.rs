//! Shared fixtures: a small native library and graph construction shortcuts.

use std::sync::Arc;

use sona_dtype::{DataType, PrimitiveType, Value};

use crate::graph::{NodeId, OutputPortId, ProgramGraph};
use crate::native::{CompileTimeArgument, NativeLibrary, NativeModule, NativeModuleId, NativeModuleParameter};

fn double(arguments: &[CompileTimeArgument], index: usize) -> Result<f64, String> {
    arguments[index].as_scalar().and_then(Value::as_f64).ok_or_else(|| format!("argument {index} is not numeric"))
}

/// Native modules over doubles, registered in library 0.
pub struct TestLibrary {
    pub library: NativeLibrary,
    pub negate: Arc<NativeModule>,
    pub add: Arc<NativeModule>,
    pub multiply: Arc<NativeModule>,
    /// Array in, sum out.
    pub sum: Arc<NativeModule>,
    /// One input, two outputs: `x` and `2x`.
    pub split: Arc<NativeModule>,
    /// No compile-time implementation.
    pub delay: Arc<NativeModule>,
    /// Side-effecting; passes its input through.
    pub probe: Arc<NativeModule>,
    /// Fails at compile time.
    pub broken: Arc<NativeModule>,
    /// Scalar in, array out; no compile-time implementation.
    pub ramp: Arc<NativeModule>,
}

impl TestLibrary {
    pub fn new() -> Self {
        use NativeModuleParameter as P;
        use PrimitiveType::Double;

        let mut library = NativeLibrary::new();
        let negate = library.register(
            NativeModule::new(NativeModuleId::new(0, 0), "negate", vec![P::input("x", Double), P::output("result", Double)])
                .with_compile_time(|_, args| Ok(vec![Value::Double(-double(args, 0)?)])),
        );
        let add = library.register(
            NativeModule::new(
                NativeModuleId::new(0, 1),
                "add",
                vec![P::input("a", Double), P::input("b", Double), P::output("result", Double)],
            )
            .with_compile_time(|_, args| Ok(vec![Value::Double(double(args, 0)? + double(args, 1)?)])),
        );
        let multiply = library.register(
            NativeModule::new(
                NativeModuleId::new(0, 2),
                "multiply",
                vec![P::input("a", Double), P::input("b", Double), P::output("result", Double)],
            )
            .with_compile_time(|_, args| Ok(vec![Value::Double(double(args, 0)? * double(args, 1)?)])),
        );
        let sum = library.register(
            NativeModule::new(
                NativeModuleId::new(0, 3),
                "sum",
                vec![P::input("values", Double).array(), P::output("result", Double)],
            )
            .with_compile_time(|_, args| match &args[0] {
                CompileTimeArgument::Array(values) => {
                    let total = values.iter().filter_map(Value::as_f64).sum();
                    Ok(vec![Value::Double(total)])
                }
                CompileTimeArgument::Scalar(_) => Err("expected an array".to_string()),
            }),
        );
        let split = library.register(
            NativeModule::new(
                NativeModuleId::new(0, 4),
                "split",
                vec![P::input("x", Double), P::output("low", Double), P::output("high", Double)],
            )
            .with_compile_time(|_, args| {
                let x = double(args, 0)?;
                Ok(vec![Value::Double(x), Value::Double(2.0 * x)])
            }),
        );
        let delay = library.register(NativeModule::new(
            NativeModuleId::new(0, 5),
            "delay",
            vec![P::input("x", Double), P::output("result", Double)],
        ));
        let probe = library.register(
            NativeModule::new(NativeModuleId::new(0, 6), "probe", vec![P::input("x", Double), P::output("result", Double)])
                .with_side_effects()
                .with_compile_time(|_, args| Ok(vec![Value::Double(double(args, 0)?)])),
        );
        let broken = library.register(
            NativeModule::new(NativeModuleId::new(0, 7), "broken", vec![P::input("x", Double), P::output("result", Double)])
                .with_compile_time(|_, _| Err("division by zero".to_string())),
        );

        let ramp = library.register(NativeModule::new(
            NativeModuleId::new(0, 8),
            "ramp",
            vec![P::input("x", Double), P::output("values", Double).array()],
        ));

        Self { library, negate, add, multiply, sum, split, delay, probe, broken, ramp }
    }
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

pub fn double_type() -> DataType {
    DataType::scalar(PrimitiveType::Double)
}

pub fn constant(graph: &mut ProgramGraph, value: f64) -> OutputPortId {
    graph.add_constant(Value::Double(value)).output(0)
}

pub fn graph_input(graph: &mut ProgramGraph) -> OutputPortId {
    graph.add_graph_input(double_type(), 0).output(0)
}

/// Graph output fed by `source`.
pub fn graph_output(graph: &mut ProgramGraph, source: OutputPortId) -> NodeId {
    let output = graph.add_graph_output();
    graph.connect(output.input(0), source);
    output
}

pub fn call(graph: &mut ProgramGraph, module: &Arc<NativeModule>, inputs: &[OutputPortId]) -> NodeId {
    call_at(graph, module, 1, inputs)
}

pub fn call_at(graph: &mut ProgramGraph, module: &Arc<NativeModule>, factor: u32, inputs: &[OutputPortId]) -> NodeId {
    let node = graph.add_native_module_call(module, factor, 0);
    for (index, &source) in inputs.iter().enumerate() {
        graph.connect(node.input(index), source);
    }
    node
}

/// Array of doubles over `elements`.
pub fn array(graph: &mut ProgramGraph, elements: &[OutputPortId]) -> OutputPortId {
    let node = graph.add_array(double_type(), elements.len());
    for (index, &source) in elements.iter().enumerate() {
        graph.connect(node.input(index), source);
    }
    node.output(0)
}

/// Constant value feeding `port`, if its producer is a constant.
pub fn constant_at(graph: &ProgramGraph, port: OutputPortId) -> Option<f64> {
    graph.node(port.node).as_constant().and_then(Value::as_f64)
}

/// Assert that every connection is recorded on both of its ends and touches only live nodes.
pub fn assert_connections_mirror(graph: &ProgramGraph) {
    for (id, node) in graph.nodes() {
        for (index, input) in node.inputs().iter().enumerate() {
            if let Some(source) = input.connection() {
                assert!(!graph.is_removed(source.node), "{id} input {index} reads removed {}", source.node);
                assert!(
                    graph.consumers(source).contains(&id.input(index)),
                    "{id} input {index} missing from consumers of {source:?}"
                );
            }
        }
        for (index, output) in node.outputs().iter().enumerate() {
            for &consumer in output.connections() {
                assert!(!graph.is_removed(consumer.node), "{id} output {index} feeds removed {}", consumer.node);
                assert_eq!(graph.connection(consumer), Some(id.output(index)));
            }
        }
    }
}
