//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced while simulating a circuit or evaluating an operator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// The circuit is wider than the backend can hold in memory.
    #[error("{backend} simulation supports at most {max} qubits, circuit has {num_qubits}")]
    TooManyQubits {
        /// Backend that rejected the circuit.
        backend: &'static str,
        /// Width of the circuit.
        num_qubits: usize,
        /// Largest supported width.
        max: usize,
    },

    /// The backend cannot represent this instruction.
    #[error("{backend} simulation does not support '{instruction}': {reason}")]
    Unsupported {
        /// Backend that rejected the instruction.
        backend: &'static str,
        /// Instruction name.
        instruction: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An operator acts on a different number of qubits than the state.
    #[error("operator acts on {operator} qubits but the state has {state}")]
    WidthMismatch {
        /// Operator width.
        operator: usize,
        /// State width.
        state: usize,
    },

    /// An operator family has no member of the requested width.
    #[error("{operator} is not defined on {num_qubits} qubits: {reason}")]
    UndefinedWidth {
        /// Operator family name.
        operator: String,
        /// Requested width.
        num_qubits: usize,
        /// Which widths are supported.
        reason: &'static str,
    },

    /// A Pauli label contained something other than `I`, `X`, `Y`, `Z`.
    #[error("invalid Pauli label '{0}'")]
    InvalidPauliLabel(String),

    /// A state vector has a bad length or zero norm.
    #[error("invalid state vector: {0}")]
    InvalidState(String),

    /// A noise probability outside `[0, 1]`.
    #[error("noise probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    /// Circuit IR error.
    #[error("Circuit IR error: {0}")]
    Ir(#[from] qcbench_ir::IrError),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
