//! Basis translation passes.

use std::f64::consts::PI;

use num_complex::Complex64;
use qcbench_ir::{Circuit, Gate, GateKind, Instruction, InstructionKind, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::matrix::{Matrix, gate_matrix, instructions_unitary};
use crate::pass::{Pass, PassKind};
use crate::passes::agnostic::OneQubitBasis;
use crate::property::{BasisGates, PropertySet};
use crate::synthesis::controlled::controlled_u;
use crate::synthesis::{UnitarySynthesis, synthesize_unitary};
use crate::unitary::Unitary2x2;

/// Basis translation pass.
///
/// Rewrites every gate outside the target basis:
/// - single-qubit gates become one rotation when the basis has a matching
///   axis, otherwise an Euler sequence in the basis (see [`OneQubitBasis`])
/// - multi-qubit standard gates are expanded over `cx` and re-translated
/// - dense unitary blocks are synthesized (KAK for two qubits, two-level
///   otherwise) and re-translated
///
/// Classical conditions are copied onto every emitted gate. The global
/// phase is kept exact for unconditioned gates.
pub struct BasisTranslation;

impl Pass for BasisTranslation {
    fn name(&self) -> &'static str {
        "BasisTranslation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let basis = properties
            .basis_gates
            .as_ref()
            .ok_or_else(|| CompileError::InvalidConfiguration("no basis gates".into()))?;

        let mut out = Vec::with_capacity(circuit.instructions().len());
        let mut phase = 0.0;
        let mut changed = false;

        for inst in circuit.instructions() {
            let InstructionKind::Gate(gate) = &inst.kind else {
                out.push(inst.clone());
                continue;
            };
            if basis.contains(gate.name()) {
                out.push(inst.clone());
                continue;
            }

            let replacement = translate_gate(&gate.kind, &inst.qubits, basis)?;
            changed = true;
            match &gate.condition {
                Some(condition) => out.extend(replacement.into_iter().map(|mut r| {
                    if let Some(g) = r.gate_mut() {
                        g.condition = Some(condition.clone());
                    }
                    r
                })),
                None => {
                    phase += phase_difference(&gate_matrix(&gate.kind), &replacement, &inst.qubits)?;
                    out.extend(replacement);
                }
            }
        }

        if changed {
            let mut rebuilt = circuit.with_instructions(out)?;
            rebuilt.add_global_phase(phase);
            *circuit = rebuilt;
        }
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.basis_gates.is_some()
    }
}

/// Phase `a` with `original = e^{i a} U(replacement)` on the given qubits.
fn phase_difference(
    original: &Matrix,
    replacement: &[Instruction],
    qubits: &[QubitId],
) -> CompileResult<f64> {
    let local: Vec<Instruction> = replacement
        .iter()
        .map(|inst| {
            let mut inst = inst.clone();
            for q in &mut inst.qubits {
                let position = qubits.iter().position(|x| x == q).unwrap_or(0);
                *q = QubitId(position as u32);
            }
            inst
        })
        .collect();
    let rebuilt = instructions_unitary(qubits.len(), &local)?;
    let overlap: Complex64 = rebuilt
        .data()
        .iter()
        .zip(original.data().iter())
        .map(|(r, o)| r.conj() * o)
        .sum();
    Ok(overlap.arg())
}

fn gate(g: StandardGate, qubits: &[QubitId]) -> Instruction {
    Instruction::gate(Gate::standard(g), qubits.iter().copied())
}

/// Translate one unconditioned gate into `basis`.
fn translate_gate(
    kind: &GateKind,
    qubits: &[QubitId],
    basis: &BasisGates,
) -> CompileResult<Vec<Instruction>> {
    let not_in_basis = |name: &str| CompileError::GateNotInBasis {
        gate: name.to_string(),
        basis: basis.to_string(),
    };

    let expansion = match kind {
        GateKind::Unitary(u) => {
            let method = if u.num_qubits == 2 {
                UnitarySynthesis::Kak
            } else {
                UnitarySynthesis::TwoLevel
            };
            synthesize_unitary(&Matrix::from(u), qubits, method)?
        }
        GateKind::Standard(g) if g.num_qubits() == 1 => {
            return translate_1q(g, qubits[0], basis).ok_or_else(|| not_in_basis(g.name()));
        }
        GateKind::Standard(g) => {
            if !basis.contains("cx") {
                return Err(not_in_basis(g.name()));
            }
            expand_multi_qubit(g, qubits)
        }
    };

    let mut out = Vec::with_capacity(expansion.len());
    for inst in expansion {
        match &inst.kind {
            InstructionKind::Gate(g) if !basis.contains(g.name()) => {
                out.extend(translate_gate(&g.kind, &inst.qubits, basis)?);
            }
            _ => out.push(inst),
        }
    }
    Ok(out)
}

/// A single rotation equal to `g` up to phase, if the basis has its axis.
fn direct_rotation(g: &StandardGate, basis: &BasisGates) -> Option<StandardGate> {
    let z = |angle: f64| basis.contains("rz").then_some(StandardGate::Rz(angle));
    match *g {
        StandardGate::X => basis.contains("rx").then_some(StandardGate::Rx(PI)),
        StandardGate::SX => basis.contains("rx").then_some(StandardGate::Rx(PI / 2.0)),
        StandardGate::SXdg => basis.contains("rx").then_some(StandardGate::Rx(-PI / 2.0)),
        StandardGate::Y => basis.contains("ry").then_some(StandardGate::Ry(PI)),
        StandardGate::Z => z(PI),
        StandardGate::S => z(PI / 2.0),
        StandardGate::Sdg => z(-PI / 2.0),
        StandardGate::T => z(PI / 4.0),
        StandardGate::Tdg => z(-PI / 4.0),
        StandardGate::P(l) => z(l),
        _ => None,
    }
}

fn translate_1q(g: &StandardGate, qubit: QubitId, basis: &BasisGates) -> Option<Vec<Instruction>> {
    if let Some(rotation) = direct_rotation(g, basis) {
        return Some(vec![Instruction::single_qubit_gate(rotation, qubit)]);
    }
    let euler = OneQubitBasis::from_basis(basis)?;
    let u = Unitary2x2::from_standard(g)?;
    Some(
        euler
            .synthesize(&u)
            .into_iter()
            .map(|g| Instruction::single_qubit_gate(g, qubit))
            .collect(),
    )
}

/// Expansion of a multi-qubit standard gate over `cx` and simpler gates.
fn expand_multi_qubit(g: &StandardGate, q: &[QubitId]) -> Vec<Instruction> {
    use StandardGate as G;
    let rzz = |theta: f64| {
        vec![
            gate(G::CX, &[q[0], q[1]]),
            gate(G::Rz(theta), &[q[1]]),
            gate(G::CX, &[q[0], q[1]]),
        ]
    };
    let conjugated = |pre: G, post: G, core: Vec<Instruction>| {
        let mut out = vec![gate(pre, &[q[0]]), gate(pre, &[q[1]])];
        out.extend(core);
        out.push(gate(post, &[q[0]]));
        out.push(gate(post, &[q[1]]));
        out
    };

    match *g {
        G::CX => vec![gate(G::CX, q)],
        G::CZ => vec![gate(G::H, &[q[1]]), gate(G::CX, q), gate(G::H, &[q[1]])],
        G::CY => vec![gate(G::Sdg, &[q[1]]), gate(G::CX, q), gate(G::S, &[q[1]])],
        G::Swap => vec![
            gate(G::CX, &[q[0], q[1]]),
            gate(G::CX, &[q[1], q[0]]),
            gate(G::CX, &[q[0], q[1]]),
        ],
        G::RZZ(theta) => rzz(theta),
        G::RXX(theta) => conjugated(G::H, G::H, rzz(theta)),
        G::RYY(theta) => conjugated(G::Rx(PI / 2.0), G::Rx(-PI / 2.0), rzz(theta)),
        G::CH => controlled_u(&Unitary2x2::h(), q[0], q[1]),
        G::CRx(t) => controlled_u(&Unitary2x2::rx(t), q[0], q[1]),
        G::CRy(t) => controlled_u(&Unitary2x2::ry(t), q[0], q[1]),
        G::CRz(t) => controlled_u(&Unitary2x2::rz(t), q[0], q[1]),
        G::CP(l) => vec![
            gate(G::P(l / 2.0), &[q[0]]),
            gate(G::CX, q),
            gate(G::P(-l / 2.0), &[q[1]]),
            gate(G::CX, q),
            gate(G::P(l / 2.0), &[q[1]]),
        ],
        G::CU3(t, p, l) => controlled_u(&Unitary2x2::u(t, p, l), q[0], q[1]),
        G::CCX => {
            let (a, b, c) = (q[0], q[1], q[2]);
            vec![
                gate(G::H, &[c]),
                gate(G::CX, &[b, c]),
                gate(G::Tdg, &[c]),
                gate(G::CX, &[a, c]),
                gate(G::T, &[c]),
                gate(G::CX, &[b, c]),
                gate(G::Tdg, &[c]),
                gate(G::CX, &[a, c]),
                gate(G::T, &[b]),
                gate(G::T, &[c]),
                gate(G::H, &[c]),
                gate(G::CX, &[a, b]),
                gate(G::T, &[a]),
                gate(G::Tdg, &[b]),
                gate(G::CX, &[a, b]),
            ]
        }
        G::CSwap => {
            let (c, a, b) = (q[0], q[1], q[2]);
            vec![
                gate(G::CX, &[b, a]),
                gate(G::CCX, &[c, a, b]),
                gate(G::CX, &[b, a]),
            ]
        }
        // Single-qubit gates never reach this expansion.
        other => vec![gate(other, q)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::circuit_unitary;
    use crate::synthesis::haar_unitary;
    use qcbench_ir::{ClassicalCondition, ClbitId, UnitaryGate};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn translate(circuit: &Circuit, basis: BasisGates) -> Circuit {
        let mut props = PropertySet::new().with_basis(basis.clone());
        let mut out = circuit.clone();
        BasisTranslation.run(&mut out, &mut props).unwrap();
        for inst in out.instructions() {
            if inst.is_gate() {
                assert!(basis.contains(inst.name()), "{} not in [{basis}]", inst.name());
            }
        }
        out
    }

    fn assert_exact(a: &Circuit, b: &Circuit) {
        let ua = circuit_unitary(a).unwrap();
        let ub = circuit_unitary(b).unwrap();
        assert!(ua.max_diff(&ub) < 1e-8, "unitaries differ by {}", ua.max_diff(&ub));
    }

    fn every_gate() -> Circuit {
        let (a, b, c) = (QubitId(0), QubitId(1), QubitId(2));
        let mut circuit = Circuit::with_size("all", 3, 0);
        circuit
            .h(a)
            .unwrap()
            .x(b)
            .unwrap()
            .y(c)
            .unwrap()
            .z(a)
            .unwrap()
            .s(b)
            .unwrap()
            .sdg(c)
            .unwrap()
            .t(a)
            .unwrap()
            .tdg(b)
            .unwrap()
            .sx(c)
            .unwrap()
            .sxdg(a)
            .unwrap()
            .rx(0.3, b)
            .unwrap()
            .ry(-0.7, c)
            .unwrap()
            .rz(1.1, a)
            .unwrap()
            .p(0.9, b)
            .unwrap()
            .u(0.4, 0.5, 0.6, c)
            .unwrap()
            .cx(a, b)
            .unwrap()
            .cy(b, c)
            .unwrap()
            .cz(c, a)
            .unwrap()
            .ch(a, c)
            .unwrap()
            .swap(b, c)
            .unwrap()
            .crx(0.2, a, b)
            .unwrap()
            .cry(0.3, b, a)
            .unwrap()
            .crz(0.4, c, b)
            .unwrap()
            .cp(0.5, a, c)
            .unwrap()
            .cu3(0.6, 0.7, 0.8, b, c)
            .unwrap()
            .rxx(0.9, a, b)
            .unwrap()
            .ryy(1.0, b, c)
            .unwrap()
            .rzz(1.1, c, a)
            .unwrap()
            .ccx(a, b, c)
            .unwrap()
            .cswap(c, a, b)
            .unwrap();
        circuit
    }

    #[test]
    fn test_translate_every_gate_portable() {
        let circuit = every_gate();
        let out = translate(&circuit, BasisGates::portable());
        assert_exact(&circuit, &out);
    }

    #[test]
    fn test_translate_every_gate_ibm() {
        let circuit = every_gate();
        let out = translate(&circuit, BasisGates::ibm());
        assert_exact(&circuit, &out);
    }

    #[test]
    fn test_translate_every_gate_cx_u() {
        let circuit = every_gate();
        let out = translate(&circuit, BasisGates::cx_u());
        assert_exact(&circuit, &out);
    }

    #[test]
    fn test_translate_direct_rotations() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.x(QubitId(0)).unwrap().t(QubitId(0)).unwrap();
        let out = translate(&circuit, BasisGates::portable());
        assert_eq!(out.gate_count(), 2);
        assert_exact(&circuit, &out);
    }

    #[test]
    fn test_translate_unitary_blocks() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut circuit = Circuit::with_size("test", 3, 0);
        let u2 = haar_unitary(4, &mut rng);
        let u3 = haar_unitary(8, &mut rng);
        circuit
            .unitary(
                UnitaryGate::new("a", 2, u2.into_data()).unwrap(),
                [QubitId(2), QubitId(0)],
            )
            .unwrap();
        circuit
            .unitary(
                UnitaryGate::new("b", 3, u3.into_data()).unwrap(),
                [QubitId(1), QubitId(2), QubitId(0)],
            )
            .unwrap();

        let out = translate(&circuit, BasisGates::cx_u());
        assert_exact(&circuit, &out);
    }

    #[test]
    fn test_translate_copies_condition() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let cz = Gate::standard(StandardGate::CZ).with_condition(ClassicalCondition::new("c", 1));
        circuit.push(Instruction::gate(cz, [QubitId(0), QubitId(1)])).unwrap();

        let out = translate(&circuit, BasisGates::portable());
        assert_eq!(out.instructions()[0].name(), "measure");
        assert!(out.instructions()[1..].iter().all(|i| i.condition().is_some()));
        assert_eq!(out.global_phase(), 0.0);
    }

    #[test]
    fn test_translate_missing_cx() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let mut props = PropertySet::new().with_basis(BasisGates::new(["cz_native", "rz"]));
        let err = BasisTranslation.run(&mut circuit, &mut props);
        assert!(matches!(err, Err(CompileError::GateNotInBasis { .. })));
    }
}
