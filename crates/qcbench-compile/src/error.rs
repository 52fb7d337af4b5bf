//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation or synthesis.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qcbench_ir::IrError),

    /// Missing coupling map for layout or routing.
    #[error("Missing coupling map for routing")]
    MissingCouplingMap,

    /// Missing layout for routing.
    #[error("Missing layout for routing")]
    MissingLayout,

    /// Routing failed because qubits are not connected.
    #[error("Routing failed: qubits {qubit1} and {qubit2} not connected")]
    RoutingFailed { qubit1: u32, qubit2: u32 },

    /// Routing only handles gates on at most two qubits.
    #[error("Cannot route {num_qubits}-qubit gate '{gate}'; translate it first")]
    UnroutableGate { gate: String, num_qubits: usize },

    /// Gate cannot be expressed in the target basis.
    #[error("Gate '{gate}' cannot be expressed in basis [{basis}]")]
    GateNotInBasis { gate: String, basis: String },

    /// Matrix passed to a synthesis routine is malformed.
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Synthesis did not converge or reproduce its target.
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Invalid pass configuration.
    #[error("Invalid pass configuration: {0}")]
    InvalidConfiguration(String),

    /// Circuit too large for target.
    #[error("Circuit requires {required} qubits but target only has {available}")]
    CircuitTooLarge { required: usize, available: u32 },
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
