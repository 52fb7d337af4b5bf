//! `qcbench-sim`: circuit simulation for expectation-value benchmarks.
//!
//! Two backends evaluate observables on the state a circuit prepares:
//!
//! - **Statevector**: ideal, exact simulation up to 24 qubits
//! - **Density matrix**: uniform depolarizing noise after every gate, up to
//!   10 qubits
//!
//! Observables are written as Pauli sums or rank-one projectors
//! ([`Operator`]). Both backends drop terminal measurements before
//! evaluating them.
//!
//! # Quick start
//!
//! ```rust
//! use qcbench_ir::Circuit;
//! use qcbench_sim::{DensityMatrix, NoiseModel, Operator, Projector, QuantumState, Statevector};
//!
//! let circuit = Circuit::ghz(3).unwrap();
//! let ghz: Operator = Projector::ghz(3).unwrap().into();
//!
//! let ideal = Statevector::from_circuit(&circuit).unwrap();
//! assert!((ideal.expectation(&ghz).unwrap() - 1.0).abs() < 1e-10);
//!
//! let noisy = DensityMatrix::from_circuit(&circuit, &NoiseModel::default()).unwrap();
//! assert!(noisy.expectation(&ghz).unwrap() < 1.0);
//! ```

pub mod density;
pub mod error;
pub mod noise;
pub mod operator;
pub mod pauli;
mod program;
pub mod statevector;

pub use density::{DensityMatrix, MAX_DENSITY_MATRIX_QUBITS};
pub use error::{SimError, SimResult};
pub use noise::NoiseModel;
pub use operator::{Operator, Projector, QuantumState};
pub use pauli::{PauliOp, PauliString, PauliSum, PauliTerm};
pub use statevector::{MAX_STATEVECTOR_QUBITS, Statevector};

use qcbench_ir::Circuit;

/// Fidelity between the states two circuits prepare from |0...0⟩.
pub fn circuit_fidelity(a: &Circuit, b: &Circuit) -> SimResult<f64> {
    Statevector::from_circuit(a)?.fidelity(&Statevector::from_circuit(b)?)
}
