//! Built-in output metrics.

use qcbench_ir::Circuit;

use crate::error::RegistryResult;
use crate::registry::RegistryBuilder;

/// `compiled / reference`, with a zero reference treated as one.
fn ratio(compiled: usize, reference: usize) -> f64 {
    compiled as f64 / reference.max(1) as f64
}

/// Number of gates in the compiled circuit.
pub fn gate_count(compiled: &Circuit, _reference: &Circuit) -> f64 {
    compiled.gate_count() as f64
}

/// Number of multi-qubit gates in the compiled circuit.
pub fn two_qubit_gate_count(compiled: &Circuit, _reference: &Circuit) -> f64 {
    compiled.two_qubit_gate_count() as f64
}

/// Depth of the compiled circuit.
pub fn depth(compiled: &Circuit, _reference: &Circuit) -> f64 {
    compiled.depth() as f64
}

/// Compiled gate count relative to the circuit handed to the compiler.
pub fn gate_count_ratio(compiled: &Circuit, reference: &Circuit) -> f64 {
    ratio(compiled.gate_count(), reference.gate_count())
}

/// Compiled two-qubit gate count relative to the reference.
pub fn two_qubit_gate_ratio(compiled: &Circuit, reference: &Circuit) -> f64 {
    ratio(compiled.two_qubit_gate_count(), reference.two_qubit_gate_count())
}

pub(crate) fn register_builtins(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .register_output_metric("gate_count", gate_count)?
        .register_output_metric("two_qubit_gate_count", two_qubit_gate_count)?
        .register_output_metric("depth", depth)?
        .register_output_metric("gate_count_ratio", gate_count_ratio)?
        .register_output_metric("two_qubit_gate_ratio", two_qubit_gate_ratio)?;
    Ok(())
}
