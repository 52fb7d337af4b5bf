//! KAK (canonical) decomposition of two-qubit unitaries.
//!
//! Every `U` in `U(4)` factors as
//!
//! ```text
//! U = e^{i g} (A1 ⊗ B1) exp(i (a XX + b YY + c ZZ)) (A2 ⊗ B2)
//! ```
//!
//! In the magic basis local gates become real orthogonal matrices and the
//! interaction term becomes diagonal, so the factorisation reduces to a
//! simultaneous real diagonalisation of `Re(M2)` and `Im(M2)` where
//! `M2 = U_B^T U_B`.

use num_complex::Complex64;
use std::f64::consts::PI;

use qcbench_ir::{Instruction, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::matrix::{Matrix, standard_gate_matrix};
use crate::synthesis::controlled::u_gate;
use crate::unitary::{EPSILON, Unitary2x2};

/// Eigenvalues of XX, YY and ZZ on the four magic-basis vectors.
const XX_SIGNS: [f64; 4] = [1.0, 1.0, -1.0, -1.0];
const YY_SIGNS: [f64; 4] = [-1.0, 1.0, -1.0, 1.0];
const ZZ_SIGNS: [f64; 4] = [1.0, -1.0, -1.0, 1.0];

/// Mixing weights tried when diagonalising `Re(M2) + r Im(M2)`.
const MIX_WEIGHTS: [f64; 4] = [0.5287, 1.3719, 2.4537, 0.1129];

/// Result of [`kak_decompose`].
///
/// Locals are stored as `(operand 0, operand 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KakDecomposition {
    /// Local gates applied first.
    pub before: (Unitary2x2, Unitary2x2),
    /// Interaction coefficients `(a, b, c)` of `exp(i (a XX + b YY + c ZZ))`.
    pub coefficients: (f64, f64, f64),
    /// Local gates applied last.
    pub after: (Unitary2x2, Unitary2x2),
}

impl KakDecomposition {
    /// Emit `u`, `rxx`, `ryy` and `rzz` gates on `(q0, q1)`.
    pub fn to_instructions(&self, q0: QubitId, q1: QubitId) -> Vec<Instruction> {
        let (a, b, c) = self.coefficients;
        let mut out = Vec::with_capacity(7);
        out.extend(u_gate(&self.before.0, q0));
        out.extend(u_gate(&self.before.1, q1));
        for (gate, angle) in [
            (StandardGate::RXX(-2.0 * a), a),
            (StandardGate::RYY(-2.0 * b), b),
            (StandardGate::RZZ(-2.0 * c), c),
        ] {
            if Unitary2x2::normalize_angle(2.0 * angle).abs() > EPSILON {
                out.push(Instruction::two_qubit_gate(gate, q0, q1));
            }
        }
        out.extend(u_gate(&self.after.0, q0));
        out.extend(u_gate(&self.after.1, q1));
        out
    }
}

fn magic_basis() -> Matrix {
    let s = 1.0 / 2.0_f64.sqrt();
    let r = Complex64::new(s, 0.0);
    let i = Complex64::new(0.0, s);
    let z = Complex64::new(0.0, 0.0);
    Matrix::from_fn(4, |row, col| match (row, col) {
        (0, 0) | (3, 0) | (1, 2) => r,
        (2, 2) => -r,
        (0, 3) | (1, 1) | (2, 1) => i,
        (3, 3) => -i,
        _ => z,
    })
}

/// Cyclic Jacobi eigen-decomposition of a real symmetric 4x4 matrix.
///
/// Returns the orthogonal matrix whose columns are eigenvectors.
fn jacobi_eigenvectors(mut a: [[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut v = [[0.0; 4]; 4];
    for (k, row) in v.iter_mut().enumerate() {
        row[k] = 1.0;
    }

    for _ in 0..100 {
        let off: f64 = (0..4)
            .flat_map(|i| (0..4).map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off < 1e-30 {
            break;
        }
        for p in 0..4 {
            for q in (p + 1)..4 {
                if a[p][q].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for row in &mut a {
                    let (kp, kq) = (row[p], row[q]);
                    row[p] = c * kp - s * kq;
                    row[q] = s * kp + c * kq;
                }
                for k in 0..4 {
                    let (pk, qk) = (a[p][k], a[q][k]);
                    a[p][k] = c * pk - s * qk;
                    a[q][k] = s * pk + c * qk;
                }
                for row in &mut v {
                    let (kp, kq) = (row[p], row[q]);
                    row[p] = c * kp - s * kq;
                    row[q] = s * kp + c * kq;
                }
            }
        }
    }
    v
}

/// Split `L = A ⊗ B` (A on operand 1, B on operand 0) into its factors.
fn split_local(l: &Matrix) -> (Unitary2x2, Unitary2x2) {
    let (mut best_r, mut best_c) = (0, 0);
    for r in 0..4 {
        for c in 0..4 {
            if l.get(r, c).norm() > l.get(best_r, best_c).norm() {
                (best_r, best_c) = (r, c);
            }
        }
    }
    let (r1, c1) = (best_r >> 1, best_c >> 1);
    let block = Unitary2x2::new(
        l.get(r1 * 2, c1 * 2),
        l.get(r1 * 2, c1 * 2 + 1),
        l.get(r1 * 2 + 1, c1 * 2),
        l.get(r1 * 2 + 1, c1 * 2 + 1),
    );
    let scale = block.det().sqrt();
    let b = Unitary2x2 {
        data: block.data.map(|v| v / scale),
    };

    let (mut r0, mut c0) = (0, 0);
    for r in 0..2 {
        for c in 0..2 {
            if b.data[r * 2 + c].norm() > b.data[r0 * 2 + c0].norm() {
                (r0, c0) = (r, c);
            }
        }
    }
    let pivot = b.data[r0 * 2 + c0];
    let a = Unitary2x2::new(
        l.get(r0, c0) / pivot,
        l.get(r0, 2 + c0) / pivot,
        l.get(2 + r0, c0) / pivot,
        l.get(2 + r0, 2 + c0) / pivot,
    );
    (a, b)
}

fn diagonal(phases: &[f64; 4]) -> Matrix {
    Matrix::from_fn(4, |r, c| {
        if r == c {
            Complex64::from_polar(1.0, phases[r])
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

fn real_matrix(m: &[[f64; 4]; 4]) -> Matrix {
    Matrix::from_fn(4, |r, c| Complex64::new(m[r][c], 0.0))
}

/// Decompose a two-qubit unitary.
pub fn kak_decompose(u: &Matrix) -> CompileResult<KakDecomposition> {
    if u.dim() != 4 {
        return Err(CompileError::InvalidMatrix(format!(
            "KAK needs a 4x4 matrix, got {0}x{0}",
            u.dim()
        )));
    }

    let det = u.det();
    let su = u.scale(Complex64::from_polar(1.0, -det.arg() / 4.0));
    let magic = magic_basis();
    let magic_dg = magic.adjoint();
    let ub = magic_dg.mul(&su).mul(&magic);
    let m2 = ub.transpose().mul(&ub);

    let mut found = None;
    for weight in MIX_WEIGHTS {
        let mut mixed = [[0.0; 4]; 4];
        for (r, row) in mixed.iter_mut().enumerate() {
            for (c, entry) in row.iter_mut().enumerate() {
                let v = m2.get(r, c);
                *entry = v.re + weight * v.im;
            }
        }
        let p = jacobi_eigenvectors(mixed);
        let pm = real_matrix(&p);
        let d = pm.transpose().mul(&m2).mul(&pm);
        let off: f64 = (0..4)
            .flat_map(|r| (0..4).map(move |c| (r, c)))
            .filter(|(r, c)| r != c)
            .map(|(r, c)| d.get(r, c).norm())
            .sum();
        if off < 1e-9 {
            found = Some(p);
            break;
        }
    }
    let mut p = found.ok_or_else(|| {
        CompileError::SynthesisFailed("could not diagonalise M2 in the magic basis".into())
    })?;

    if real_matrix(&p).det().re < 0.0 {
        for row in &mut p {
            row[0] = -row[0];
        }
    }
    let pm = real_matrix(&p);
    let d = pm.transpose().mul(&m2).mul(&pm);
    let mut half = [0.0; 4];
    for (k, h) in half.iter_mut().enumerate() {
        *h = d.get(k, k).arg() / 2.0;
    }

    let inverse_phases = |half: &[f64; 4]| diagonal(&half.map(|h| -h));
    let mut k1 = ub.mul(&pm).mul(&inverse_phases(&half));
    if k1.det().re < 0.0 {
        half[0] += PI;
        k1 = ub.mul(&pm).mul(&inverse_phases(&half));
    }

    let project = |signs: &[f64; 4]| -> f64 {
        half.iter().zip(signs.iter()).map(|(h, s)| h * s).sum::<f64>() / 4.0
    };
    let coefficients = (project(&XX_SIGNS), project(&YY_SIGNS), project(&ZZ_SIGNS));

    let after = split_local(&magic.mul(&k1).mul(&magic_dg));
    let before = split_local(&magic.mul(&pm.transpose()).mul(&magic_dg));

    let result = KakDecomposition {
        before: (before.1, before.0),
        coefficients,
        after: (after.1, after.0),
    };

    let rebuilt = instructions_unitary_2q(&result);
    if !rebuilt.equiv(u) {
        return Err(CompileError::SynthesisFailed(
            "KAK factors do not reproduce the input".into(),
        ));
    }
    Ok(result)
}

fn kron(high: &Unitary2x2, low: &Unitary2x2) -> Matrix {
    Matrix::from_fn(4, |r, c| {
        high.data[(r >> 1) * 2 + (c >> 1)] * low.data[(r & 1) * 2 + (c & 1)]
    })
}

fn instructions_unitary_2q(k: &KakDecomposition) -> Matrix {
    let (a, b, c) = k.coefficients;
    let interaction = standard_gate_matrix(&StandardGate::RXX(-2.0 * a))
        .mul(&standard_gate_matrix(&StandardGate::RYY(-2.0 * b)))
        .mul(&standard_gate_matrix(&StandardGate::RZZ(-2.0 * c)));
    kron(&k.after.1, &k.after.0)
        .mul(&interaction)
        .mul(&kron(&k.before.1, &k.before.0))
}

/// Decompose a two-qubit unitary on `(q0, q1)` into local `u` gates and
/// `rxx`/`ryy`/`rzz` interactions.
pub fn decompose(u: &Matrix, q0: QubitId, q1: QubitId) -> CompileResult<Vec<Instruction>> {
    Ok(kak_decompose(u)?.to_instructions(q0, q1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::instructions_unitary;
    use crate::synthesis::random::haar_unitary;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn check(u: &Matrix) {
        let ops = decompose(u, QubitId(0), QubitId(1)).unwrap();
        let got = instructions_unitary(2, &ops).unwrap();
        assert!(got.equiv(u));
        assert!(ops.iter().all(|i| matches!(i.name(), "u" | "rxx" | "ryy" | "rzz")));
    }

    #[test]
    fn test_magic_basis_is_unitary() {
        assert!(magic_basis().is_unitary(1e-12));
    }

    #[test]
    fn test_kak_random() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            check(&haar_unitary(4, &mut rng));
        }
    }

    #[test]
    fn test_kak_degenerate_inputs() {
        check(&Matrix::identity(4));
        check(&standard_gate_matrix(&StandardGate::CX));
        check(&standard_gate_matrix(&StandardGate::Swap));
        check(&standard_gate_matrix(&StandardGate::CZ));
        check(&kron(&Unitary2x2::h(), &Unitary2x2::rx(0.3)));
    }

    #[test]
    fn test_kak_local_gate_has_no_interaction() {
        let k = kak_decompose(&kron(&Unitary2x2::y(), &Unitary2x2::sx())).unwrap();
        let ops = k.to_instructions(QubitId(0), QubitId(1));
        assert!(ops.iter().all(|i| i.qubits.len() == 1));
    }

    #[test]
    fn test_kak_cx_interaction_strength() {
        let k = kak_decompose(&standard_gate_matrix(&StandardGate::CX)).unwrap();
        let (a, b, c) = k.coefficients;
        let mut strengths = [a.abs(), b.abs(), c.abs()].map(|v| {
            let v = v % (PI / 2.0);
            v.min(PI / 2.0 - v)
        });
        strengths.sort_by(f64::total_cmp);
        // CX is locally equivalent to exp(i pi/4 XX).
        assert!(strengths[0] < 1e-9);
        assert!(strengths[1] < 1e-9);
        assert!((strengths[2] - PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_kak_rejects_wrong_size() {
        assert!(kak_decompose(&Matrix::identity(2)).is_err());
    }
}
