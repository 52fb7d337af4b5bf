//! Statevector simulation engine.

use num_complex::Complex64;
use tracing::trace;

use qcbench_compile::{apply_local, gate_matrix};
use qcbench_ir::{Circuit, GateKind, Instruction, InstructionKind};

use crate::error::{SimError, SimResult};
use crate::operator::{Operator, QuantumState};
use crate::pauli::BasisAction;
use crate::program::simulation_instructions;

/// Widest circuit the statevector backend accepts.
pub const MAX_STATEVECTOR_QUBITS: usize = 24;

const BACKEND: &str = "statevector";

/// A pure state over `num_qubits` qubits.
///
/// Amplitude `k` belongs to the basis state whose bit `j` is the value of
/// qubit `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> SimResult<Self> {
        if num_qubits > MAX_STATEVECTOR_QUBITS {
            return Err(SimError::TooManyQubits {
                backend: BACKEND,
                num_qubits,
                max: MAX_STATEVECTOR_QUBITS,
            });
        }
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Ok(Self {
            amplitudes,
            num_qubits,
        })
    }

    /// Wrap explicit amplitudes. The length must be a power of two.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> SimResult<Self> {
        let len = amplitudes.len();
        if !len.is_power_of_two() {
            return Err(SimError::InvalidState(format!(
                "{len} amplitudes is not a power of two"
            )));
        }
        Ok(Self {
            amplitudes,
            num_qubits: len.trailing_zeros() as usize,
        })
    }

    /// Simulate `circuit` from |0...0⟩.
    ///
    /// Terminal measurements are dropped. Mid-circuit measurement, reset
    /// and classically conditioned gates are rejected.
    pub fn from_circuit(circuit: &Circuit) -> SimResult<Self> {
        let mut state = Self::new(circuit.num_qubits())?;
        for inst in simulation_instructions(circuit) {
            state.apply(inst)?;
        }
        let phase = Complex64::from_polar(1.0, circuit.global_phase());
        for amp in &mut state.amplitudes {
            *amp *= phase;
        }
        trace!(
            "Simulated '{}' on {} qubits",
            circuit.name(),
            state.num_qubits
        );
        Ok(state)
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The state amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Measurement probabilities in the computational basis.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Squared norm of the state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Inner product ⟨self|other⟩.
    pub fn inner(&self, other: &Self) -> SimResult<Complex64> {
        if self.num_qubits != other.num_qubits {
            return Err(SimError::WidthMismatch {
                operator: other.num_qubits,
                state: self.num_qubits,
            });
        }
        Ok(self
            .amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum())
    }

    /// State fidelity |⟨self|other⟩|².
    pub fn fidelity(&self, other: &Self) -> SimResult<f64> {
        Ok(self.inner(other)?.norm_sqr())
    }

    /// Apply an instruction to the statevector.
    pub fn apply(&mut self, instruction: &Instruction) -> SimResult<()> {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                if gate.condition.is_some() {
                    return Err(unsupported(instruction, "classical conditions are not tracked"));
                }
                let qubits: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();
                self.apply_gate(&gate.kind, &qubits);
                Ok(())
            }
            InstructionKind::Barrier | InstructionKind::Delay { .. } => Ok(()),
            InstructionKind::Measure => Err(unsupported(
                instruction,
                "mid-circuit measurement needs the density-matrix backend",
            )),
            InstructionKind::Reset => Err(unsupported(
                instruction,
                "reset needs the density-matrix backend",
            )),
        }
    }

    /// Apply a gate to specific qubits.
    pub fn apply_gate(&mut self, gate: &GateKind, qubits: &[usize]) {
        apply_local(&mut self.amplitudes, &gate_matrix(gate), qubits);
    }
}

fn unsupported(instruction: &Instruction, reason: &'static str) -> SimError {
    SimError::Unsupported {
        backend: BACKEND,
        instruction: instruction.name().to_string(),
        reason,
    }
}

impl QuantumState for Statevector {
    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn expectation(&self, operator: &Operator) -> SimResult<f64> {
        operator.check_width(self.num_qubits)?;
        let value = match operator {
            Operator::Pauli(sum) => sum
                .terms()
                .iter()
                .map(|term| {
                    let action = BasisAction::new(&term.pauli);
                    let mut acc = Complex64::new(0.0, 0.0);
                    for (i, amp) in self.amplitudes.iter().enumerate() {
                        let (j, coeff) = action.apply(i);
                        acc += self.amplitudes[j].conj() * coeff * amp;
                    }
                    term.coeff * acc.re
                })
                .sum(),
            Operator::Projector(projector) => projector
                .state()
                .iter()
                .zip(&self.amplitudes)
                .map(|(p, a)| p.conj() * a)
                .sum::<Complex64>()
                .norm_sqr(),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcbench_ir::{ClbitId, QubitId};
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-10, "{a} != {b}");
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(3).unwrap();
        assert_eq!(sv.num_qubits(), 3);
        assert_eq!(sv.amplitudes()[0], Complex64::new(1.0, 0.0));
        assert_close(sv.norm_sqr(), 1.0);
    }

    #[test]
    fn test_too_many_qubits() {
        let err = Statevector::new(MAX_STATEVECTOR_QUBITS + 1);
        assert!(matches!(err, Err(SimError::TooManyQubits { .. })));
    }

    #[test]
    fn test_bell_state() {
        let sv = Statevector::from_circuit(&Circuit::bell().unwrap()).unwrap();
        let probs = sv.probabilities();
        assert_close(probs[0], 0.5);
        assert_close(probs[3], 0.5);
        assert_close(sv.amplitudes()[3].re, FRAC_1_SQRT_2);
    }

    #[test]
    fn test_little_endian_order() {
        let mut circuit = Circuit::with_size("x1", 3, 0);
        circuit.x(QubitId(1)).unwrap();
        let sv = Statevector::from_circuit(&circuit).unwrap();
        assert_close(sv.probabilities()[0b010], 1.0);
    }

    #[test]
    fn test_global_phase_applied() {
        let mut circuit = Circuit::with_size("phase", 1, 0);
        circuit.add_global_phase(PI / 2.0);
        let sv = Statevector::from_circuit(&circuit).unwrap();
        assert_close(sv.amplitudes()[0].im, 1.0);
    }

    #[test]
    fn test_fidelity_ignores_global_phase() {
        let a = Statevector::from_circuit(&Circuit::ghz(3).unwrap()).unwrap();
        let mut circuit = Circuit::ghz(3).unwrap();
        circuit.add_global_phase(1.234);
        let b = Statevector::from_circuit(&circuit).unwrap();
        assert_close(a.fidelity(&b).unwrap(), 1.0);
    }

    #[test]
    fn test_mid_circuit_measurement_rejected() {
        let mut circuit = Circuit::with_size("mid", 1, 1);
        circuit
            .h(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .h(QubitId(0))
            .unwrap();
        let err = Statevector::from_circuit(&circuit);
        assert!(matches!(err, Err(SimError::Unsupported { .. })));
    }

    #[test]
    fn test_reset_rejected() {
        let mut circuit = Circuit::with_size("reset", 1, 0);
        circuit.reset(QubitId(0)).unwrap();
        assert!(Statevector::from_circuit(&circuit).is_err());
    }

    #[test]
    fn test_from_amplitudes_requires_power_of_two() {
        let amps = vec![Complex64::new(1.0, 0.0); 3];
        assert!(Statevector::from_amplitudes(amps).is_err());
    }
}
