//! Density-matrix simulation with depolarizing noise.

use num_complex::Complex64;
use tracing::trace;

use qcbench_compile::{Matrix, apply_local, gate_matrix};
use qcbench_ir::{Circuit, Instruction, InstructionKind};

use crate::error::{SimError, SimResult};
use crate::noise::NoiseModel;
use crate::operator::{Operator, QuantumState};
use crate::pauli::BasisAction;
use crate::program::simulation_instructions;
use crate::statevector::Statevector;

/// Widest circuit the density-matrix backend accepts.
pub const MAX_DENSITY_MATRIX_QUBITS: usize = 10;

const BACKEND: &str = "density-matrix";
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// A mixed state over `num_qubits` qubits.
///
/// Entry `(r, c)` is stored at `(r << n) | c`, so the matrix can be viewed
/// as a vector over `2n` qubits: row bits above column bits.
#[derive(Debug, Clone)]
pub struct DensityMatrix {
    data: Vec<Complex64>,
    num_qubits: usize,
}

impl DensityMatrix {
    /// Create |0...0⟩⟨0...0|.
    pub fn new(num_qubits: usize) -> SimResult<Self> {
        check_width(num_qubits)?;
        let mut data = vec![ZERO; 1 << (2 * num_qubits)];
        data[0] = Complex64::new(1.0, 0.0);
        Ok(Self { data, num_qubits })
    }

    /// The pure state |ψ⟩⟨ψ|.
    pub fn from_statevector(state: &Statevector) -> SimResult<Self> {
        let n = state.num_qubits();
        check_width(n)?;
        let amps = state.amplitudes();
        let mut data = Vec::with_capacity(amps.len() * amps.len());
        for r in amps {
            for c in amps {
                data.push(r * c.conj());
            }
        }
        Ok(Self {
            data,
            num_qubits: n,
        })
    }

    /// Simulate `circuit` from |0...0⟩ under `noise`.
    ///
    /// Terminal measurements are dropped; mid-circuit measurements dephase
    /// the measured qubit. Classically conditioned gates are rejected.
    pub fn from_circuit(circuit: &Circuit, noise: &NoiseModel) -> SimResult<Self> {
        noise.validate()?;
        let mut state = Self::new(circuit.num_qubits())?;
        for inst in simulation_instructions(circuit) {
            state.apply(inst, noise)?;
        }
        trace!(
            "Simulated '{}' on {} qubits with noise {:?}",
            circuit.name(),
            state.num_qubits,
            noise
        );
        Ok(state)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Entry `ρ[row, col]`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[(row << self.num_qubits) | col]
    }

    /// Trace of the matrix.
    pub fn trace(&self) -> f64 {
        (0..self.dim()).map(|i| self.get(i, i).re).sum()
    }

    /// Purity tr(ρ²).
    pub fn purity(&self) -> f64 {
        self.data.iter().map(Complex64::norm_sqr).sum()
    }

    /// Apply one instruction followed by its gate noise.
    pub fn apply(&mut self, instruction: &Instruction, noise: &NoiseModel) -> SimResult<()> {
        let qubits: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                if gate.condition.is_some() {
                    return Err(SimError::Unsupported {
                        backend: BACKEND,
                        instruction: instruction.name().to_string(),
                        reason: "classical conditions are not tracked",
                    });
                }
                self.apply_unitary(&gate_matrix(&gate.kind), &qubits);
                self.depolarize(&qubits, noise.error_for(qubits.len()));
            }
            InstructionKind::Measure => {
                for &q in &qubits {
                    self.dephase(q);
                }
            }
            InstructionKind::Reset => {
                for &q in &qubits {
                    self.reset(q);
                }
            }
            InstructionKind::Barrier | InstructionKind::Delay { .. } => {}
        }
        Ok(())
    }

    /// ρ ↦ U ρ U† with `unitary` acting on `qubits`.
    pub fn apply_unitary(&mut self, unitary: &Matrix, qubits: &[usize]) {
        let n = self.num_qubits;
        let rows: Vec<usize> = qubits.iter().map(|q| q + n).collect();
        apply_local(&mut self.data, unitary, &rows);
        let conj = Matrix::from_fn(unitary.dim(), |r, c| unitary.get(r, c).conj());
        apply_local(&mut self.data, &conj, qubits);
    }

    /// Depolarizing channel with probability `p` on `qubits`.
    pub fn depolarize(&mut self, qubits: &[usize], p: f64) {
        if p == 0.0 || qubits.is_empty() {
            return;
        }
        let n = self.num_qubits;
        let dim = self.dim();
        let mask: usize = qubits.iter().map(|&q| 1usize << q).sum();
        let subsets = subsets(mask);
        let weight = p / subsets.len() as f64;

        for rb in (0..dim).filter(|r| r & mask == 0) {
            for cb in (0..dim).filter(|c| c & mask == 0) {
                let reduced: Complex64 = subsets
                    .iter()
                    .map(|&s| self.data[((rb | s) << n) | (cb | s)])
                    .sum();
                for &sr in &subsets {
                    for &sc in &subsets {
                        let idx = ((rb | sr) << n) | (cb | sc);
                        self.data[idx] *= 1.0 - p;
                        if sr == sc {
                            self.data[idx] += reduced * weight;
                        }
                    }
                }
            }
        }
    }

    /// Remove coherences between the two values of `qubit`.
    pub fn dephase(&mut self, qubit: usize) {
        let n = self.num_qubits;
        let bit = 1usize << qubit;
        let dim = self.dim();
        for r in 0..dim {
            for c in 0..dim {
                if (r ^ c) & bit != 0 {
                    self.data[(r << n) | c] = ZERO;
                }
            }
        }
    }

    /// Reset `qubit` to |0⟩, keeping the rest of the state.
    pub fn reset(&mut self, qubit: usize) {
        let n = self.num_qubits;
        let bit = 1usize << qubit;
        let dim = self.dim();
        for r in (0..dim).filter(|r| r & bit == 0) {
            for c in (0..dim).filter(|c| c & bit == 0) {
                let moved = self.data[((r | bit) << n) | (c | bit)];
                self.data[(r << n) | c] += moved;
                self.data[((r | bit) << n) | (c | bit)] = ZERO;
                self.data[((r | bit) << n) | c] = ZERO;
                self.data[(r << n) | (c | bit)] = ZERO;
            }
        }
    }
}

fn check_width(num_qubits: usize) -> SimResult<()> {
    if num_qubits > MAX_DENSITY_MATRIX_QUBITS {
        return Err(SimError::TooManyQubits {
            backend: BACKEND,
            num_qubits,
            max: MAX_DENSITY_MATRIX_QUBITS,
        });
    }
    Ok(())
}

/// Every subset of the bits in `mask`, starting with the empty set.
fn subsets(mask: usize) -> Vec<usize> {
    let mut out = vec![0];
    let mut s = mask & mask.wrapping_neg();
    while s != 0 {
        out.push(s);
        s = s.wrapping_sub(mask) & mask;
    }
    out
}

impl QuantumState for DensityMatrix {
    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn expectation(&self, operator: &Operator) -> SimResult<f64> {
        operator.check_width(self.num_qubits)?;
        let dim = self.dim();
        let value = match operator {
            Operator::Pauli(sum) => sum
                .terms()
                .iter()
                .map(|term| {
                    let action = BasisAction::new(&term.pauli);
                    let acc: Complex64 = (0..dim)
                        .map(|i| {
                            let (j, coeff) = action.apply(i);
                            coeff * self.get(i, j)
                        })
                        .sum();
                    term.coeff * acc.re
                })
                .sum(),
            Operator::Projector(projector) => {
                let phi = projector.state();
                let mut acc = ZERO;
                for (r, pr) in phi.iter().enumerate() {
                    for (c, pc) in phi.iter().enumerate() {
                        acc += pr.conj() * self.get(r, c) * pc;
                    }
                }
                acc.re
            }
        };
        Ok(value)
    }
}
