//! Controlled single-qubit gates.
//!
//! A singly-controlled `U = e^{i a} Rz(b) Ry(g) Rz(d)` is lowered with the
//! ABC construction:
//!
//! ```text
//! target:  ─C─⊕─B─⊕─A─
//! control: ───●───●───P(a)─
//! ```
//!
//! with `A = Rz(b) Ry(g/2)`, `B = Ry(-g/2) Rz(-(d+b)/2)` and
//! `C = Rz((d-b)/2)`, each emitted as one `u` gate. Gates with more controls
//! recurse through `V = sqrt(U)`.

use qcbench_ir::{Instruction, QubitId, StandardGate};

use crate::unitary::{EPSILON, Unitary2x2};

/// A `u` gate equal to `m` up to global phase, or `None` for the identity.
pub fn u_gate(m: &Unitary2x2, qubit: QubitId) -> Option<Instruction> {
    if m.is_identity() {
        return None;
    }
    let (theta, phi, lambda, _) = m.zyz().to_u3();
    Some(Instruction::single_qubit_gate(
        StandardGate::U(theta, phi, lambda),
        qubit,
    ))
}

/// Singly-controlled `U` via the ABC construction, up to global phase.
pub fn controlled_u(u: &Unitary2x2, control: QubitId, target: QubitId) -> Vec<Instruction> {
    if u.is_pauli_x() {
        return vec![Instruction::two_qubit_gate(StandardGate::CX, control, target)];
    }

    let z = u.zyz();
    let a = Unitary2x2::rz(z.beta) * Unitary2x2::ry(z.gamma / 2.0);
    let b = Unitary2x2::ry(-z.gamma / 2.0) * Unitary2x2::rz(-(z.delta + z.beta) / 2.0);
    let c = Unitary2x2::rz((z.delta - z.beta) / 2.0);

    let mut out = Vec::with_capacity(6);
    out.extend(u_gate(&c, target));
    out.push(Instruction::two_qubit_gate(StandardGate::CX, control, target));
    out.extend(u_gate(&b, target));
    out.push(Instruction::two_qubit_gate(StandardGate::CX, control, target));
    out.extend(u_gate(&a, target));
    if Unitary2x2::normalize_angle(z.phase).abs() > EPSILON {
        out.push(Instruction::single_qubit_gate(StandardGate::P(z.phase), control));
    }
    out
}

/// Multi-controlled X. One and two controls map to `cx` and `ccx`.
pub fn multi_controlled_x(controls: &[QubitId], target: QubitId) -> Vec<Instruction> {
    match controls {
        [] => vec![Instruction::single_qubit_gate(StandardGate::X, target)],
        [c] => vec![Instruction::two_qubit_gate(StandardGate::CX, *c, target)],
        [c1, c2] => vec![Instruction::gate(StandardGate::CCX, [*c1, *c2, target])],
        _ => multi_controlled_u(&Unitary2x2::x(), controls, target),
    }
}

/// `U` on `target`, applied when every control is `|1>`.
///
/// With `k >= 2` controls, `C^k(U)` is built from `V = sqrt(U)`:
/// `C(V)` on the last control, `C^{k-1}(X)` onto it, `C(V^dagger)`, the
/// `C^{k-1}(X)` again, then `C^{k-1}(V)` from the remaining controls.
pub fn multi_controlled_u(u: &Unitary2x2, controls: &[QubitId], target: QubitId) -> Vec<Instruction> {
    let Some((&last, rest)) = controls.split_last() else {
        return u_gate(u, target).into_iter().collect();
    };
    if u.is_pauli_x() && controls.len() <= 2 {
        return multi_controlled_x(controls, target);
    }
    if rest.is_empty() {
        return controlled_u(u, last, target);
    }

    let v = u.sqrt();
    let mut out = controlled_u(&v, last, target);
    out.extend(multi_controlled_x(rest, last));
    out.extend(controlled_u(&v.dagger(), last, target));
    out.extend(multi_controlled_x(rest, last));
    out.extend(multi_controlled_u(&v, rest, target));
    out
}
