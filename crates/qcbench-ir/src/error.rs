//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A register with this name already exists.
    #[error("Register '{0}' is already declared")]
    DuplicateRegister(String),

    /// Declaring a register would exceed the circuit width limit.
    #[error("Circuit would have {requested} {kind}, more than the limit of {limit}")]
    RegisterTooLarge {
        /// `qubits` or `classical bits`.
        kind: &'static str,
        /// Total width after the declaration.
        requested: u64,
        /// The limit.
        limit: u32,
    },

    /// A condition or operand names an undeclared classical register.
    #[error("Unknown classical register '{0}'")]
    UnknownRegister(String),

    /// A unitary gate was given a matrix of the wrong size.
    #[error("Unitary for {num_qubits} qubits needs {expected} entries, got {got}")]
    InvalidMatrix {
        /// Number of qubits of the gate.
        num_qubits: u32,
        /// Expected number of matrix entries.
        expected: usize,
        /// Actual number of entries.
        got: usize,
    },

    /// Measurement operands do not pair up.
    #[error("measure: {qubits} qubits but {clbits} classical bits")]
    MeasureArity {
        /// Number of qubits given.
        qubits: usize,
        /// Number of classical bits given.
        clbits: usize,
    },
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
