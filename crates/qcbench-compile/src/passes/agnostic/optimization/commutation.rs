//! Rotation merging through commuting gates.

use std::f64::consts::PI;

use qcbench_ir::{Circuit, Instruction, QubitId, StandardGate};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

fn rotation_axis(gate: &StandardGate) -> Option<(Axis, f64)> {
    match *gate {
        StandardGate::Rx(t) => Some((Axis::X, t)),
        StandardGate::Ry(t) => Some((Axis::Y, t)),
        StandardGate::Rz(t) | StandardGate::P(t) => Some((Axis::Z, t)),
        _ => None,
    }
}

fn with_angle(gate: &StandardGate, angle: f64) -> StandardGate {
    match gate {
        StandardGate::Rx(_) => StandardGate::Rx(angle),
        StandardGate::Ry(_) => StandardGate::Ry(angle),
        StandardGate::Rz(_) => StandardGate::Rz(angle),
        _ => StandardGate::P(angle),
    }
}

/// Whether `inst` commutes with a rotation about `axis` on `qubit`.
fn commutes(inst: &Instruction, qubit: QubitId, axis: Axis) -> bool {
    let Some(gate) = inst.as_plain_standard() else {
        return false;
    };
    let position = inst.qubits.iter().position(|&q| q == qubit);
    match axis {
        Axis::Z => {
            gate.is_diagonal()
                || match gate {
                    StandardGate::CX
                    | StandardGate::CY
                    | StandardGate::CH
                    | StandardGate::CRx(_)
                    | StandardGate::CRy(_)
                    | StandardGate::CU3(..)
                    | StandardGate::CSwap => position == Some(0),
                    StandardGate::CCX => matches!(position, Some(0 | 1)),
                    _ => false,
                }
        }
        Axis::X => match gate {
            StandardGate::X
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::RXX(_) => true,
            StandardGate::CX | StandardGate::CRx(_) => position == Some(1),
            StandardGate::CCX => position == Some(2),
            _ => false,
        },
        Axis::Y => match gate {
            StandardGate::Y | StandardGate::Ry(_) | StandardGate::RYY(_) => true,
            StandardGate::CY | StandardGate::CRy(_) => position == Some(1),
            _ => false,
        },
    }
}

/// Commutative cancellation pass.
///
/// Moves each `rx`, `ry`, `rz` or `p` gate backwards through gates that
/// commute with it on its qubit and merges it into an earlier rotation of
/// the same kind. Rotations that end up trivial are removed; `R(2 pi)`
/// contributes a global phase of `pi`.
pub struct CommutativeCancellation;

impl CommutativeCancellation {
    /// Create a new commutative cancellation pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CommutativeCancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase contributed by removing a trivial rotation, or `None` if not trivial.
fn trivial_phase(gate: &StandardGate) -> Option<f64> {
    match *gate {
        StandardGate::P(t) => {
            let t = t.rem_euclid(2.0 * PI);
            (t < EPSILON || 2.0 * PI - t < EPSILON).then_some(0.0)
        }
        StandardGate::Rx(t) | StandardGate::Ry(t) | StandardGate::Rz(t) => {
            let t = t.rem_euclid(4.0 * PI);
            if t < EPSILON || 4.0 * PI - t < EPSILON {
                Some(0.0)
            } else if (t - 2.0 * PI).abs() < EPSILON {
                Some(PI)
            } else {
                None
            }
        }
        _ => None,
    }
}

impl Pass for CommutativeCancellation {
    fn name(&self) -> &'static str {
        "CommutativeCancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut out: Vec<Instruction> = Vec::with_capacity(circuit.instructions().len());
        let mut history: Vec<Vec<usize>> = vec![vec![]; circuit.num_qubits()];
        let mut merged = 0usize;

        'outer: for inst in circuit.instructions() {
            if let (Some(gate), [qubit]) = (inst.as_plain_standard(), inst.qubits.as_slice()) {
                if let Some((axis, angle)) = rotation_axis(gate) {
                    for &k in history[qubit.index()].iter().rev() {
                        let same_kind = out[k]
                            .as_plain_standard()
                            .filter(|g| std::mem::discriminant(*g) == std::mem::discriminant(gate))
                            .and_then(rotation_axis);
                        if let Some((_, earlier_angle)) = same_kind {
                            out[k] = Instruction::single_qubit_gate(
                                with_angle(gate, earlier_angle + angle),
                                *qubit,
                            );
                            merged += 1;
                            continue 'outer;
                        }
                        if !commutes(&out[k], *qubit, axis) {
                            break;
                        }
                    }
                }
            }
            let index = out.len();
            for q in &inst.qubits {
                history[q.index()].push(index);
            }
            out.push(inst.clone());
        }

        let mut phase = 0.0;
        let mut removed = 0usize;
        out.retain(|inst| {
            let trivial = inst.as_plain_standard().and_then(trivial_phase);
            if let Some(p) = trivial {
                phase += p;
                removed += 1;
            }
            trivial.is_none()
        });

        if merged > 0 || removed > 0 {
            let mut rebuilt = circuit.with_instructions(out)?;
            rebuilt.add_global_phase(phase);
            *circuit = rebuilt;
        }
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit, _properties: &PropertySet) -> bool {
        circuit.gate_count() > 0
    }
}
