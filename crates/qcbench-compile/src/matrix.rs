//! Dense unitary matrices over a few qubits.
//!
//! Qubit ordering is little-endian throughout: bit `k` of a basis-state index
//! belongs to the `k`-th operand (for gate matrices) or to qubit `k` (for
//! whole-circuit matrices).

use num_complex::Complex64;

use qcbench_ir::{Circuit, GateKind, Instruction, InstructionKind, StandardGate, UnitaryGate};

use crate::error::{CompileError, CompileResult};
use crate::unitary::Unitary2x2;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A square complex matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dim: usize,
    data: Vec<Complex64>,
}

impl Matrix {
    /// The zero matrix.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![ZERO; dim * dim],
        }
    }

    /// The identity matrix.
    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.data[i * dim + i] = ONE;
        }
        m
    }

    /// Wrap row-major data, checking that it is square.
    pub fn from_vec(dim: usize, data: Vec<Complex64>) -> CompileResult<Self> {
        if data.len() != dim * dim {
            return Err(CompileError::InvalidMatrix(format!(
                "expected {} entries for dimension {dim}, got {}",
                dim * dim,
                data.len()
            )));
        }
        Ok(Self { dim, data })
    }

    /// Build a matrix entry by entry.
    pub fn from_fn(dim: usize, mut f: impl FnMut(usize, usize) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(dim * dim);
        for r in 0..dim {
            for c in 0..dim {
                data.push(f(r, c));
            }
        }
        Self { dim, data }
    }

    /// Embed a 2x2 unitary.
    pub fn from_2x2(u: &Unitary2x2) -> Self {
        Self {
            dim: 2,
            data: u.data.to_vec(),
        }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of qubits, if the dimension is a power of two.
    pub fn num_qubits(&self) -> Option<u32> {
        self.dim
            .is_power_of_two()
            .then(|| self.dim.trailing_zeros())
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim + col]
    }

    /// Set the entry at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.dim + col] = value;
    }

    /// Row-major entries.
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Consume into row-major entries.
    pub fn into_data(self) -> Vec<Complex64> {
        self.data
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &Self) -> Self {
        let n = self.dim;
        let mut out = Self::zeros(n);
        for r in 0..n {
            for k in 0..n {
                let a = self.get(r, k);
                if a == ZERO {
                    continue;
                }
                for c in 0..n {
                    out.data[r * n + c] += a * other.get(k, c);
                }
            }
        }
        out
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        Self::from_fn(self.dim, |r, c| self.get(c, r).conj())
    }

    /// Plain transpose.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.dim, |r, c| self.get(c, r))
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&self, factor: Complex64) -> Self {
        Self {
            dim: self.dim,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Check `U^dagger U = I` within `tol`.
    pub fn is_unitary(&self, tol: f64) -> bool {
        let p = self.adjoint().mul(self);
        let id = Self::identity(self.dim);
        p.max_diff(&id) < tol
    }

    /// Largest entrywise distance to `other`.
    pub fn max_diff(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Check equality up to a global phase: `|tr(A^dagger B)| == dim`.
    pub fn equiv(&self, other: &Self) -> bool {
        if self.dim != other.dim {
            return false;
        }
        let overlap: Complex64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.conj() * b)
            .sum();
        (overlap.norm() - self.dim as f64).abs() < 1e-8 * self.dim as f64
    }

    /// Determinant by Gaussian elimination with partial pivoting.
    pub fn det(&self) -> Complex64 {
        let n = self.dim;
        let mut a = self.data.clone();
        let mut det = ONE;
        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x * n + col].norm().total_cmp(&a[y * n + col].norm()))
                .unwrap_or(col);
            if a[pivot * n + col].norm() < 1e-300 {
                return ZERO;
            }
            if pivot != col {
                for k in 0..n {
                    a.swap(pivot * n + k, col * n + k);
                }
                det = -det;
            }
            let p = a[col * n + col];
            det *= p;
            for row in (col + 1)..n {
                let factor = a[row * n + col] / p;
                if factor == ZERO {
                    continue;
                }
                for k in col..n {
                    let v = a[col * n + k];
                    a[row * n + k] -= factor * v;
                }
            }
        }
        det
    }

    /// The 2x2 block of a 2x2 matrix, `None` for other sizes.
    pub fn to_2x2(&self) -> Option<Unitary2x2> {
        (self.dim == 2).then(|| Unitary2x2 {
            data: [self.data[0], self.data[1], self.data[2], self.data[3]],
        })
    }
}

impl From<&UnitaryGate> for Matrix {
    fn from(gate: &UnitaryGate) -> Self {
        Self {
            dim: gate.dim(),
            data: gate.matrix.clone(),
        }
    }
}

/// Two-qubit controlled gate: operand 0 controls, operand 1 is the target.
fn controlled(u: &Unitary2x2) -> Matrix {
    Matrix::from_fn(4, |r, c| {
        if (r & 1) != (c & 1) {
            ZERO
        } else if r & 1 == 0 {
            if r == c { ONE } else { ZERO }
        } else {
            u.data[(r >> 1) * 2 + (c >> 1)]
        }
    })
}

/// `exp(-i theta/2 P⊗P)` for a Pauli `P`.
fn pauli_pair_rotation(pauli: &Unitary2x2, theta: f64) -> Matrix {
    let (s, co) = (theta / 2.0).sin_cos();
    let minus_i_sin = Complex64::new(0.0, -s);
    Matrix::from_fn(4, |r, c| {
        let pp = pauli.data[(r >> 1) * 2 + (c >> 1)] * pauli.data[(r & 1) * 2 + (c & 1)];
        let diag = if r == c { Complex64::new(co, 0.0) } else { ZERO };
        diag + minus_i_sin * pp
    })
}

/// Permutation matrix sending basis state `c` to `perm(c)`.
fn permutation(dim: usize, perm: impl Fn(usize) -> usize) -> Matrix {
    Matrix::from_fn(dim, |r, c| if perm(c) == r { ONE } else { ZERO })
}

/// Matrix of a standard gate in operand order.
pub fn standard_gate_matrix(gate: &StandardGate) -> Matrix {
    if let Some(u) = Unitary2x2::from_standard(gate) {
        return Matrix::from_2x2(&u);
    }
    match *gate {
        StandardGate::CX => controlled(&Unitary2x2::x()),
        StandardGate::CY => controlled(&Unitary2x2::y()),
        StandardGate::CZ => controlled(&Unitary2x2::z()),
        StandardGate::CH => controlled(&Unitary2x2::h()),
        StandardGate::CRx(t) => controlled(&Unitary2x2::rx(t)),
        StandardGate::CRy(t) => controlled(&Unitary2x2::ry(t)),
        StandardGate::CRz(t) => controlled(&Unitary2x2::rz(t)),
        StandardGate::CP(l) => controlled(&Unitary2x2::p(l)),
        StandardGate::CU3(t, p, l) => controlled(&Unitary2x2::u(t, p, l)),
        StandardGate::Swap => permutation(4, |i| ((i & 1) << 1) | (i >> 1)),
        StandardGate::RXX(t) => pauli_pair_rotation(&Unitary2x2::x(), t),
        StandardGate::RYY(t) => pauli_pair_rotation(&Unitary2x2::y(), t),
        StandardGate::RZZ(t) => pauli_pair_rotation(&Unitary2x2::z(), t),
        StandardGate::CCX => permutation(8, |i| if i & 0b011 == 0b011 { i ^ 0b100 } else { i }),
        StandardGate::CSwap => permutation(8, |i| {
            if i & 1 == 1 {
                let (b1, b2) = ((i >> 1) & 1, (i >> 2) & 1);
                1 | (b2 << 1) | (b1 << 2)
            } else {
                i
            }
        }),
        // Single-qubit gates were handled above.
        _ => Matrix::identity(2),
    }
}

/// Matrix of any gate kind in operand order.
pub fn gate_matrix(kind: &GateKind) -> Matrix {
    match kind {
        GateKind::Standard(g) => standard_gate_matrix(g),
        GateKind::Unitary(u) => Matrix::from(u),
    }
}

/// Apply a `2^k x 2^k` matrix to the listed qubits of a statevector.
///
/// `state.len()` must be a power of two covering every listed qubit.
pub fn apply_local(state: &mut [Complex64], local: &Matrix, qubits: &[usize]) {
    let local_dim = local.dim();
    let mask: usize = qubits.iter().map(|&q| 1usize << q).sum();
    let mut indices = vec![0usize; local_dim];
    let mut buffer = vec![ZERO; local_dim];

    for base in 0..state.len() {
        if base & mask != 0 {
            continue;
        }
        for (l, slot) in indices.iter_mut().enumerate() {
            let mut i = base;
            for (j, &q) in qubits.iter().enumerate() {
                if (l >> j) & 1 == 1 {
                    i |= 1 << q;
                }
            }
            *slot = i;
        }
        for (l, &i) in indices.iter().enumerate() {
            buffer[l] = state[i];
        }
        for (r, &i) in indices.iter().enumerate() {
            let mut acc = ZERO;
            for (col, &amp) in buffer.iter().enumerate() {
                acc += local.get(r, col) * amp;
            }
            state[i] = acc;
        }
    }
}

/// Unitary of an instruction sequence over `num_qubits` qubits.
///
/// Barriers and delays are ignored. Measurement, reset and classically
/// conditioned gates have no unitary and are rejected.
pub fn instructions_unitary(num_qubits: usize, instructions: &[Instruction]) -> CompileResult<Matrix> {
    let dim = 1usize << num_qubits;
    let mut columns: Vec<Vec<Complex64>> = (0..dim)
        .map(|c| {
            let mut v = vec![ZERO; dim];
            v[c] = ONE;
            v
        })
        .collect();

    for inst in instructions {
        match &inst.kind {
            InstructionKind::Barrier | InstructionKind::Delay { .. } => continue,
            InstructionKind::Gate(gate) if gate.condition.is_none() => {
                let local = gate_matrix(&gate.kind);
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                for column in &mut columns {
                    apply_local(column, &local, &qubits);
                }
            }
            _ => {
                return Err(CompileError::InvalidConfiguration(format!(
                    "instruction '{}' has no unitary",
                    inst.name()
                )));
            }
        }
    }

    Ok(Matrix::from_fn(dim, |r, c| columns[c][r]))
}

/// Unitary of a whole circuit, including its global phase.
pub fn circuit_unitary(circuit: &Circuit) -> CompileResult<Matrix> {
    let u = instructions_unitary(circuit.num_qubits(), circuit.instructions())?;
    Ok(u.scale(Complex64::from_polar(1.0, circuit.global_phase())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcbench_ir::QubitId;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_and_mul() {
        let h = standard_gate_matrix(&StandardGate::H);
        let hh = h.mul(&h);
        assert!(hh.max_diff(&Matrix::identity(2)) < 1e-12);
        assert_eq!(h.num_qubits(), Some(1));
    }

    #[test]
    fn test_cx_little_endian() {
        let cx = standard_gate_matrix(&StandardGate::CX);
        // |c=1, t=0> = index 1 maps to |c=1, t=1> = index 3.
        assert_eq!(cx.get(3, 1), ONE);
        assert_eq!(cx.get(1, 3), ONE);
        assert_eq!(cx.get(2, 2), ONE);
        assert!(cx.is_unitary(1e-12));
    }

    #[test]
    fn test_all_standard_gates_unitary() {
        let gates = [
            StandardGate::CY,
            StandardGate::CZ,
            StandardGate::CH,
            StandardGate::Swap,
            StandardGate::CRx(0.3),
            StandardGate::CRy(1.2),
            StandardGate::CRz(-0.7),
            StandardGate::CP(0.5),
            StandardGate::CU3(0.1, 0.2, 0.3),
            StandardGate::RXX(0.4),
            StandardGate::RYY(0.9),
            StandardGate::RZZ(-1.1),
            StandardGate::CCX,
            StandardGate::CSwap,
        ];
        for g in gates {
            let m = standard_gate_matrix(&g);
            assert_eq!(m.dim(), 1 << g.num_qubits());
            assert!(m.is_unitary(1e-12), "{g:?}");
        }
    }

    #[test]
    fn test_rzz_diagonal() {
        let m = standard_gate_matrix(&StandardGate::RZZ(PI));
        assert!((m.get(0, 0) - Complex64::new(0.0, -1.0)).norm() < 1e-12);
        assert!((m.get(1, 1) - Complex64::new(0.0, 1.0)).norm() < 1e-12);
        assert!(m.get(0, 3).norm() < 1e-12);
    }

    #[test]
    fn test_cswap_permutation() {
        let m = standard_gate_matrix(&StandardGate::CSwap);
        assert_eq!(m.get(5, 3), ONE);
        assert_eq!(m.get(3, 5), ONE);
        assert_eq!(m.get(2, 2), ONE);
    }

    #[test]
    fn test_circuit_unitary_bell() {
        let mut circuit = Circuit::with_size("bell", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let u = circuit_unitary(&circuit).unwrap();
        let s = 1.0 / 2.0_f64.sqrt();
        // Column 0 is (|00> + |11>)/sqrt(2).
        assert!((u.get(0, 0).re - s).abs() < 1e-12);
        assert!((u.get(3, 0).re - s).abs() < 1e-12);
        assert!(u.get(1, 0).norm() < 1e-12);
    }

    #[test]
    fn test_operand_order_matters() {
        let mut a = Circuit::with_size("a", 2, 0);
        a.cx(QubitId(0), QubitId(1)).unwrap();
        let mut b = Circuit::with_size("b", 2, 0);
        b.cx(QubitId(1), QubitId(0)).unwrap();
        let ua = circuit_unitary(&a).unwrap();
        let ub = circuit_unitary(&b).unwrap();
        assert!(!ua.equiv(&ub));
    }

    #[test]
    fn test_measure_has_no_unitary() {
        let circuit = Circuit::bell().unwrap();
        assert!(circuit_unitary(&circuit).is_err());
    }

    #[test]
    fn test_det() {
        let swap = standard_gate_matrix(&StandardGate::Swap);
        assert!((swap.det() - Complex64::new(-1.0, 0.0)).norm() < 1e-12);
        let rzz = standard_gate_matrix(&StandardGate::RZZ(0.8));
        assert!((rzz.det() - ONE).norm() < 1e-12);
        assert_eq!(Matrix::zeros(3).det(), ZERO);
    }

    #[test]
    fn test_equiv_ignores_global_phase() {
        let z = standard_gate_matrix(&StandardGate::Z);
        let phased = z.scale(Complex64::from_polar(1.0, 0.7));
        assert!(z.equiv(&phased));
        assert!(!z.equiv(&Matrix::identity(2)));
    }
}
