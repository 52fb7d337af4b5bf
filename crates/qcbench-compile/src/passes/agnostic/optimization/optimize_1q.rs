//! Single-qubit gate optimization pass.

use std::f64::consts::PI;

use num_complex::Complex64;
use qcbench_ir::{Circuit, Instruction, QubitId, StandardGate};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};
use crate::unitary::Unitary2x2;

use super::EPSILON;

/// Target basis for 1-qubit gate decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OneQubitBasis {
    /// A single `u` gate.
    #[default]
    U3,
    /// RZ and SX (IBM native).
    ZSX,
    /// RZ, RY, RZ.
    ZYZ,
}

impl OneQubitBasis {
    /// Pick the cheapest basis expressible in `basis`, if any.
    pub fn from_basis(basis: &BasisGates) -> Option<Self> {
        if basis.contains("u") {
            Some(Self::U3)
        } else if basis.contains("rz") && basis.contains("sx") {
            Some(Self::ZSX)
        } else if basis.contains("rz") && basis.contains("ry") {
            Some(Self::ZYZ)
        } else {
            None
        }
    }

    /// Gates realising `u` up to global phase, in time order.
    pub fn synthesize(self, u: &Unitary2x2) -> Vec<StandardGate> {
        if u.is_identity() {
            return vec![];
        }
        let z = u.zyz();
        let rz = |angle: f64, out: &mut Vec<StandardGate>| {
            let angle = Unitary2x2::normalize_angle(angle);
            if angle.abs() > EPSILON {
                out.push(StandardGate::Rz(angle));
            }
        };

        let mut gates = Vec::with_capacity(5);
        match self {
            Self::U3 => {
                let (theta, phi, lambda, _) = z.to_u3();
                gates.push(StandardGate::U(theta, phi, lambda));
            }
            _ if z.gamma.abs() < EPSILON => rz(z.beta + z.delta, &mut gates),
            Self::ZYZ => {
                rz(z.delta, &mut gates);
                gates.push(StandardGate::Ry(z.gamma));
                rz(z.beta, &mut gates);
            }
            Self::ZSX if (z.gamma - PI / 2.0).abs() < EPSILON => {
                rz(z.delta - PI / 2.0, &mut gates);
                gates.push(StandardGate::SX);
                rz(z.beta + PI / 2.0, &mut gates);
            }
            Self::ZSX => {
                rz(z.delta, &mut gates);
                gates.push(StandardGate::SX);
                rz(z.gamma + PI, &mut gates);
                gates.push(StandardGate::SX);
                rz(z.beta + PI, &mut gates);
            }
        }
        gates
    }
}

/// Single-qubit gate optimization pass.
///
/// Merges each maximal run of unconditioned single-qubit gates on a qubit
/// into one unitary and re-synthesizes it in the target basis. A run is
/// only replaced when the new sequence is strictly shorter.
pub struct Optimize1qGates {
    basis: Option<OneQubitBasis>,
}

impl Default for Optimize1qGates {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimize1qGates {
    /// Create an optimizer that picks its basis from the `PropertySet`.
    pub fn new() -> Self {
        Self { basis: None }
    }

    /// Create an optimizer with a fixed basis.
    pub fn with_basis(basis: OneQubitBasis) -> Self {
        Self { basis: Some(basis) }
    }

    fn resolve_basis(&self, properties: &PropertySet) -> Option<OneQubitBasis> {
        match (self.basis, &properties.basis_gates) {
            (Some(basis), _) => Some(basis),
            (None, Some(gates)) => OneQubitBasis::from_basis(gates),
            (None, None) => Some(OneQubitBasis::U3),
        }
    }
}

/// A maximal run of single-qubit gates on one qubit.
struct Run {
    qubit: QubitId,
    indices: Vec<usize>,
    unitary: Unitary2x2,
}

fn find_1q_runs(circuit: &Circuit) -> Vec<Run> {
    let mut open: Vec<Option<Run>> = (0..circuit.num_qubits()).map(|_| None).collect();
    let mut runs = Vec::new();

    for (index, inst) in circuit.instructions().iter().enumerate() {
        let single = match (inst.as_plain_standard(), inst.qubits.as_slice()) {
            (Some(gate), [q]) => Unitary2x2::from_standard(gate).map(|u| (*q, u)),
            _ => None,
        };
        match single {
            Some((qubit, u)) => {
                let run = open[qubit.index()].get_or_insert_with(|| Run {
                    qubit,
                    indices: vec![],
                    unitary: Unitary2x2::identity(),
                });
                run.indices.push(index);
                run.unitary = u * run.unitary;
            }
            None => {
                for q in &inst.qubits {
                    runs.extend(open[q.index()].take());
                }
            }
        }
    }
    runs.extend(open.into_iter().flatten());
    runs
}

/// Phase `a` with `target = e^{i a} product`.
fn relative_phase(target: &Unitary2x2, product: &Unitary2x2) -> f64 {
    let overlap: Complex64 = product
        .data
        .iter()
        .zip(target.data.iter())
        .map(|(p, t)| p.conj() * t)
        .sum();
    overlap.arg()
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &'static str {
        "Optimize1qGates"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let Some(basis) = self.resolve_basis(properties) else {
            return Ok(());
        };

        let n = circuit.instructions().len();
        let mut replaced: Vec<Option<Vec<Instruction>>> = vec![None; n];
        let mut removed = vec![false; n];
        let mut phase = 0.0;
        let mut changed = false;

        for run in find_1q_runs(circuit) {
            let gates = basis.synthesize(&run.unitary);
            if gates.len() >= run.indices.len() {
                continue;
            }
            let product = gates
                .iter()
                .filter_map(Unitary2x2::from_standard)
                .fold(Unitary2x2::identity(), |acc, g| g * acc);
            phase += relative_phase(&run.unitary, &product);

            for &i in &run.indices {
                removed[i] = true;
            }
            replaced[run.indices[0]] = Some(
                gates
                    .into_iter()
                    .map(|g| Instruction::single_qubit_gate(g, run.qubit))
                    .collect(),
            );
            changed = true;
        }

        if !changed {
            return Ok(());
        }

        let mut out = Vec::with_capacity(n);
        for (i, inst) in circuit.instructions().iter().enumerate() {
            if let Some(new) = replaced[i].take() {
                out.extend(new);
            } else if !removed[i] {
                out.push(inst.clone());
            }
        }
        let mut rebuilt = circuit.with_instructions(out)?;
        rebuilt.add_global_phase(phase);
        *circuit = rebuilt;
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit, _properties: &PropertySet) -> bool {
        circuit.gate_count() > 0
    }
}
