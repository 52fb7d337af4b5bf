//! Capability contracts for pluggable providers.
//!
//! The runner only talks to providers through these traits and looks them
//! up by id in the [`Registry`](crate::registry::Registry):
//!
//! | Trait | Registered as | Called |
//! |-------|---------------|--------|
//! | [`Compiler`] | factory (fresh instance per task) | once per task |
//! | [`Observable`] | shared instance | during simulation |
//! | [`OutputMetric`] | shared instance | after compilation and as a measurement |

use std::collections::BTreeMap;
use std::sync::Arc;

use qcbench_ir::Circuit;
use qcbench_sim::{Operator, QuantumState, SimResult};

use crate::devices::TargetDevice;
use crate::error::CompilationError;

/// Free-form provider arguments from the suite's `compiler_args` table.
pub type CompilerArgs = serde_json::Map<String, serde_json::Value>;

/// A compiled circuit plus the compiler's own notes about the run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The compiled circuit.
    pub circuit: Circuit,
    /// Provider-defined numeric notes (pass counts, rounds, ...).
    pub metrics: BTreeMap<String, f64>,
}

impl CompileOutput {
    /// Output without notes.
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            metrics: BTreeMap::new(),
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// A quantum-circuit compiler under benchmark.
///
/// Implementations never mutate their input and report failures as
/// [`CompilationError`] rather than returning a malformed circuit. The
/// runner measures wall time around [`compile`](Self::compile).
pub trait Compiler: Send {
    /// Registry id.
    fn id(&self) -> &str;

    /// Provider version, checked against the suite's `version` when given.
    fn version(&self) -> &str;

    /// Reject malformed `compiler_args` before any task runs.
    fn validate_args(&self, _args: &CompilerArgs) -> Result<(), CompilationError> {
        Ok(())
    }

    /// Compile `circuit`, optionally for a target device.
    fn compile(
        &self,
        circuit: &Circuit,
        args: &CompilerArgs,
        target: Option<&TargetDevice>,
    ) -> Result<CompileOutput, CompilationError>;
}

/// Builds a fresh compiler instance.
pub type CompilerFactory = Arc<dyn Fn() -> Box<dyn Compiler> + Send + Sync>;

/// An operator whose expectation value is measured on simulated states.
pub trait Observable: Send + Sync {
    /// The operator for a circuit of `num_qubits` qubits.
    fn operator(&self, num_qubits: usize) -> SimResult<Operator>;

    /// Expectation value on a simulated state.
    fn expectation(&self, state: &dyn QuantumState) -> SimResult<f64> {
        let operator = self.operator(state.num_qubits())?;
        state.expectation(&operator)
    }
}

impl<F> Observable for F
where
    F: Fn(usize) -> SimResult<Operator> + Send + Sync,
{
    fn operator(&self, num_qubits: usize) -> SimResult<Operator> {
        self(num_qubits)
    }
}

/// A structural property of a compiled circuit.
pub trait OutputMetric: Send + Sync {
    /// Compute the metric; `reference` is the circuit handed to the compiler.
    fn compute(&self, compiled: &Circuit, reference: &Circuit) -> f64;
}

impl<F> OutputMetric for F
where
    F: Fn(&Circuit, &Circuit) -> f64 + Send + Sync,
{
    fn compute(&self, compiled: &Circuit, reference: &Circuit) -> f64 {
        self(compiled, reference)
    }
}
