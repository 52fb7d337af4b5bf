//! Two-level (Givens) decomposition of an n-qubit unitary.
//!
//! `U` is reduced column by column with two-level unitaries `T_k`, each
//! acting on a pair of basis states, until `T_m ... T_1 U = I`. Then
//! `U = T_1^dagger ... T_m^dagger`.
//!
//! A two-level unitary on states `(i, j)` is realised by walking a Gray code
//! from `i` to `j`: multi-controlled X gates move state `i` next to `j`, a
//! multi-controlled single-qubit gate acts on the one differing bit, and the
//! moves are undone. Controls on `|0>` are X-conjugated.

use num_complex::Complex64;

use qcbench_ir::{Instruction, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::matrix::Matrix;
use crate::synthesis::controlled::{multi_controlled_u, multi_controlled_x};
use crate::unitary::Unitary2x2;

const TOLERANCE: f64 = 1e-12;

/// A unitary acting on basis states `low` and `high` only.
///
/// `matrix` is in the order `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLevelUnitary {
    /// First basis state.
    pub low: usize,
    /// Second basis state.
    pub high: usize,
    /// Action on the two-state subspace.
    pub matrix: Unitary2x2,
}

impl TwoLevelUnitary {
    fn apply_rows(&self, w: &mut Matrix) {
        let m = &self.matrix.data;
        for col in 0..w.dim() {
            let a = w.get(self.low, col);
            let b = w.get(self.high, col);
            w.set(self.low, col, m[0] * a + m[1] * b);
            w.set(self.high, col, m[2] * a + m[3] * b);
        }
    }
}

/// Factor `u` into two-level unitaries, in circuit order.
///
/// Applying the returned factors first to last reproduces `u` exactly.
pub fn two_level_factors(u: &Matrix) -> Vec<TwoLevelUnitary> {
    let d = u.dim();
    let mut w = u.clone();
    let mut steps: Vec<TwoLevelUnitary> = Vec::new();
    let mut push = |w: &mut Matrix, t: TwoLevelUnitary| {
        t.apply_rows(w);
        steps.push(t);
    };

    for c in 0..d.saturating_sub(1) {
        for r in (c + 1)..d {
            let b = w.get(r, c);
            if b.norm() < TOLERANCE {
                continue;
            }
            let a = w.get(c, c);
            let n = (a.norm_sqr() + b.norm_sqr()).sqrt();
            let g = Unitary2x2::new(a.conj() / n, b.conj() / n, b / n, -a / n);
            push(&mut w, TwoLevelUnitary { low: c, high: r, matrix: g });
        }

        let diag = w.get(c, c);
        if c + 2 < d {
            if (diag - Complex64::new(1.0, 0.0)).norm() > TOLERANCE {
                let g = Unitary2x2::new(
                    diag.conj(),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(1.0, 0.0),
                );
                push(&mut w, TwoLevelUnitary { low: c, high: c + 1, matrix: g });
            }
        } else {
            let last = w.get(c + 1, c + 1);
            let g = Unitary2x2::new(
                diag.conj(),
                Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0),
                last.conj(),
            );
            if !exactly_identity(&g) {
                push(&mut w, TwoLevelUnitary { low: c, high: c + 1, matrix: g });
            }
        }
    }

    // U = T_1^dagger ... T_m^dagger: apply T_m^dagger first.
    steps
        .into_iter()
        .rev()
        .map(|t| TwoLevelUnitary {
            matrix: t.matrix.dagger(),
            ..t
        })
        .collect()
}

fn exactly_identity(u: &Unitary2x2) -> bool {
    (u.data[0] - Complex64::new(1.0, 0.0)).norm() < TOLERANCE
        && (u.data[3] - Complex64::new(1.0, 0.0)).norm() < TOLERANCE
        && u.data[1].norm() < TOLERANCE
        && u.data[2].norm() < TOLERANCE
}

/// Gates for one two-level unitary over `qubits` (bit `k` is `qubits[k]`).
pub fn emit_two_level(t: &TwoLevelUnitary, qubits: &[QubitId]) -> Vec<Instruction> {
    let n = qubits.len();

    let mut path = vec![t.low];
    let mut current = t.low;
    for bit in 0..n {
        if ((current ^ t.high) >> bit) & 1 == 1 {
            current ^= 1 << bit;
            path.push(current);
        }
    }

    let controlled_on = |target_bit: usize, state: usize, u: &Unitary2x2| -> Vec<Instruction> {
        let controls: Vec<QubitId> = (0..n)
            .filter(|&b| b != target_bit)
            .map(|b| qubits[b])
            .collect();
        let flips: Vec<Instruction> = (0..n)
            .filter(|&b| b != target_bit && (state >> b) & 1 == 0)
            .map(|b| Instruction::single_qubit_gate(StandardGate::X, qubits[b]))
            .collect();
        let mut out = flips.clone();
        if u.is_pauli_x() {
            out.extend(multi_controlled_x(&controls, qubits[target_bit]));
        } else {
            out.extend(multi_controlled_u(u, &controls, qubits[target_bit]));
        }
        out.extend(flips);
        out
    };

    let differing_bit = |a: usize, b: usize| (a ^ b).trailing_zeros() as usize;
    let moves: Vec<Vec<Instruction>> = path
        .windows(2)
        .take(path.len().saturating_sub(2))
        .map(|w| controlled_on(differing_bit(w[0], w[1]), w[0], &Unitary2x2::x()))
        .collect();

    let m = path.len() - 1;
    let (from, to) = (path[m - 1], path[m]);
    let target_bit = differing_bit(from, to);
    let core = if (from >> target_bit) & 1 == 0 {
        t.matrix
    } else {
        Unitary2x2::x() * t.matrix * Unitary2x2::x()
    };

    let mut out: Vec<Instruction> = moves.iter().flatten().cloned().collect();
    out.extend(controlled_on(target_bit, to, &core));
    out.extend(moves.into_iter().rev().flatten());
    out
}

/// Decompose `u` into `u`, `p`, `x`, `cx` and `ccx` gates on `qubits`.
pub fn decompose(u: &Matrix, qubits: &[QubitId]) -> CompileResult<Vec<Instruction>> {
    if u.dim() != 1 << qubits.len() {
        return Err(CompileError::InvalidMatrix(format!(
            "dimension {} does not match {} qubits",
            u.dim(),
            qubits.len()
        )));
    }
    Ok(two_level_factors(u)
        .iter()
        .flat_map(|t| emit_two_level(t, qubits))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::instructions_unitary;
    use crate::synthesis::random::haar_unitary;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn qubits(n: u32) -> Vec<QubitId> {
        (0..n).map(QubitId).collect()
    }

    fn reassemble(factors: &[TwoLevelUnitary], dim: usize) -> Matrix {
        let mut w = Matrix::identity(dim);
        for t in factors {
            t.apply_rows(&mut w);
        }
        w
    }

    #[test]
    fn test_factors_reproduce_exactly() {
        let mut rng = SmallRng::seed_from_u64(11);
        for dim in [2, 4, 8] {
            let u = haar_unitary(dim, &mut rng);
            let factors = two_level_factors(&u);
            assert!(reassemble(&factors, dim).max_diff(&u) < 1e-10);
        }
    }

    #[test]
    fn test_identity_has_no_factors() {
        assert!(two_level_factors(&Matrix::identity(4)).is_empty());
    }

    #[test]
    fn test_emit_two_level_gray_path() {
        // States 1 (|001>) and 6 (|110>) differ in all three bits.
        let t = TwoLevelUnitary {
            low: 1,
            high: 6,
            matrix: Unitary2x2::ry(0.8),
        };
        let ops = emit_two_level(&t, &qubits(3));
        let got = instructions_unitary(3, &ops).unwrap();
        assert!(got.equiv(&reassemble(&[t], 8)));
    }

    #[test]
    fn test_decompose_random_unitaries() {
        let mut rng = SmallRng::seed_from_u64(5);
        for n in 1..=3u32 {
            let u = haar_unitary(1 << n, &mut rng);
            let ops = decompose(&u, &qubits(n)).unwrap();
            let got = instructions_unitary(n as usize, &ops).unwrap();
            assert!(got.equiv(&u), "n = {n}");
            assert!(ops.iter().all(|i| matches!(
                i.name(),
                "u" | "p" | "x" | "cx" | "ccx"
            )));
        }
    }

    #[test]
    fn test_decompose_permuted_qubits() {
        let mut rng = SmallRng::seed_from_u64(9);
        let u = haar_unitary(4, &mut rng);
        let ops = decompose(&u, &[QubitId(2), QubitId(0)]).unwrap();
        // Rebuild on 3 qubits and compare with u placed on (q2, q0).
        let got = instructions_unitary(3, &ops).unwrap();
        let expected = instructions_unitary(
            3,
            &[Instruction::gate(
                qcbench_ir::UnitaryGate::new("u", 2, u.data().to_vec()).unwrap(),
                [QubitId(2), QubitId(0)],
            )],
        )
        .unwrap();
        assert!(got.equiv(&expected));
    }

    #[test]
    fn test_decompose_rejects_size_mismatch() {
        assert!(decompose(&Matrix::identity(4), &qubits(3)).is_err());
    }
}
