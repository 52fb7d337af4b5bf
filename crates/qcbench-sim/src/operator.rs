//! Operators whose expectation values the backends compute.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::pauli::PauliSum;

/// A Hermitian operator in one of the forms observables are written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operator {
    /// Real-weighted sum of Pauli strings.
    Pauli(PauliSum),
    /// Rank-one projector |ψ⟩⟨ψ|.
    Projector(Projector),
}

impl Operator {
    /// Fail unless the operator can be evaluated on `num_qubits` qubits.
    ///
    /// Pauli sums may touch fewer qubits than the state; projectors must
    /// match its width exactly.
    pub fn check_width(&self, num_qubits: usize) -> SimResult<()> {
        let operator = match self {
            Operator::Pauli(sum) => sum.min_qubits() as usize,
            Operator::Projector(p) => p.num_qubits(),
        };
        let fits = match self {
            Operator::Pauli(_) => operator <= num_qubits,
            Operator::Projector(_) => operator == num_qubits,
        };
        if fits {
            Ok(())
        } else {
            Err(SimError::WidthMismatch {
                operator,
                state: num_qubits,
            })
        }
    }
}

impl From<PauliSum> for Operator {
    fn from(sum: PauliSum) -> Self {
        Operator::Pauli(sum)
    }
}

impl From<Projector> for Operator {
    fn from(projector: Projector) -> Self {
        Operator::Projector(projector)
    }
}

/// Projector onto a normalized pure state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projector {
    state: Vec<Complex64>,
}

impl Projector {
    /// Project onto `state`, normalizing it first.
    pub fn new(mut state: Vec<Complex64>) -> SimResult<Self> {
        let len = state.len();
        if len == 0 || !len.is_power_of_two() {
            return Err(SimError::InvalidState(format!(
                "{len} amplitudes is not a power of two"
            )));
        }
        let norm = state.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return Err(SimError::InvalidState("zero vector".into()));
        }
        for amp in &mut state {
            *amp /= norm;
        }
        Ok(Self { state })
    }

    /// Build from real amplitudes.
    pub fn from_real(amplitudes: impl IntoIterator<Item = f64>) -> SimResult<Self> {
        Self::new(
            amplitudes
                .into_iter()
                .map(|a| Complex64::new(a, 0.0))
                .collect(),
        )
    }

    /// Projector onto (|0...0⟩ + |1...1⟩)/√2.
    pub fn ghz(num_qubits: usize) -> SimResult<Self> {
        let dim = 1usize << num_qubits;
        Self::from_real((0..dim).map(|i| if i == 0 || i == dim - 1 { 1.0 } else { 0.0 }))
    }

    /// Projector onto the uniform superposition of all basis states.
    pub fn uniform(num_qubits: usize) -> SimResult<Self> {
        Self::from_real(std::iter::repeat_n(1.0, 1usize << num_qubits))
    }

    /// The normalized state.
    pub fn state(&self) -> &[Complex64] {
        &self.state
    }

    /// Number of qubits the projector acts on.
    pub fn num_qubits(&self) -> usize {
        self.state.len().trailing_zeros() as usize
    }
}

/// A simulated state that expectation values can be taken on.
pub trait QuantumState {
    /// Number of qubits in the state.
    fn num_qubits(&self) -> usize;

    /// Real expectation value ⟨O⟩ of a Hermitian operator.
    fn expectation(&self, operator: &Operator) -> SimResult<f64>;
}
