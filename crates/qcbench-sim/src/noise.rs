//! Depolarizing noise model for the density-matrix backend.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Default depolarizing probability after single-qubit gates.
pub const DEFAULT_SINGLE_QUBIT_ERROR: f64 = 0.001;
/// Default depolarizing probability after multi-qubit gates.
pub const DEFAULT_TWO_QUBIT_ERROR: f64 = 0.01;

/// Uniform depolarizing noise applied after every gate.
///
/// A gate on `k` qubits is followed by the channel
/// `ρ ↦ (1 - p)·ρ + p·Tr_k(ρ) ⊗ I/2^k` on its operands, with `p` the
/// single- or two-qubit error. Gates on three or more qubits use the
/// two-qubit error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseModel {
    /// Error probability after single-qubit gates.
    pub single_qubit_error: f64,
    /// Error probability after multi-qubit gates.
    pub two_qubit_error: f64,
}

impl NoiseModel {
    /// Create a validated noise model.
    pub fn new(single_qubit_error: f64, two_qubit_error: f64) -> SimResult<Self> {
        let model = Self {
            single_qubit_error,
            two_qubit_error,
        };
        model.validate()?;
        Ok(model)
    }

    /// A model with no noise.
    pub fn ideal() -> Self {
        Self {
            single_qubit_error: 0.0,
            two_qubit_error: 0.0,
        }
    }

    /// Check both probabilities lie in `[0, 1]`.
    pub fn validate(&self) -> SimResult<()> {
        for p in [self.single_qubit_error, self.two_qubit_error] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidProbability(p));
            }
        }
        Ok(())
    }

    /// Error probability after a gate on `num_qubits` qubits.
    pub fn error_for(&self, num_qubits: usize) -> f64 {
        match num_qubits {
            0 => 0.0,
            1 => self.single_qubit_error,
            _ => self.two_qubit_error,
        }
    }

    /// True when every probability is zero.
    pub fn is_ideal(&self) -> bool {
        self.single_qubit_error == 0.0 && self.two_qubit_error == 0.0
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            single_qubit_error: DEFAULT_SINGLE_QUBIT_ERROR,
            two_qubit_error: DEFAULT_TWO_QUBIT_ERROR,
        }
    }
}
