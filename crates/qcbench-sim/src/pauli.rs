//! Pauli strings and weighted Pauli sums.
//!
//! A Pauli sum is a real-weighted sum of Pauli strings:
//!
//!   O = Σ_k  c_k · P_k
//!
//! where each P_k is a tensor product of single-qubit Pauli operators
//! (I, X, Y, Z).
//!
//! Text labels follow the usual convention that the **leftmost character
//! acts on the highest qubit**: `"ZIX"` on three qubits is `Z₂ ⊗ I₁ ⊗ X₀`.
//!
//! # Example
//!
//! ```rust
//! use qcbench_sim::pauli::{PauliOp, PauliString, PauliSum, PauliTerm};
//!
//! // O = -1.0·Z₀Z₁  +  0.5·X₀
//! let o = PauliSum::from_terms(vec![
//!     PauliTerm::new(-1.0, PauliString::from_ops(vec![(0, PauliOp::Z), (1, PauliOp::Z)])),
//!     PauliTerm::new(0.5, PauliString::from_label("IX").unwrap()),
//! ]);
//! assert_eq!(o.n_terms(), 2);
//! assert_eq!(o.min_qubits(), 2);
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauliOp {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl PauliOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PauliOp::I),
            'X' => Some(PauliOp::X),
            'Y' => Some(PauliOp::Y),
            'Z' => Some(PauliOp::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            PauliOp::I => 'I',
            PauliOp::X => 'X',
            PauliOp::Y => 'Y',
            PauliOp::Z => 'Z',
        }
    }
}

/// A tensor product of Pauli operators on indexed qubits.
///
/// Stored as a sorted `Vec<(qubit_index, PauliOp)>` with identity factors
/// omitted. Qubits not listed are implicitly I.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PauliString {
    /// Non-identity factors, sorted by qubit index ascending.
    ops: Vec<(u32, PauliOp)>,
}

impl PauliString {
    /// Construct a PauliString from (qubit, op) pairs.
    ///
    /// Identity operators are dropped; the remaining ops are sorted by qubit.
    pub fn from_ops(ops: impl IntoIterator<Item = (u32, PauliOp)>) -> Self {
        let mut v: Vec<(u32, PauliOp)> = ops
            .into_iter()
            .filter(|(_, op)| *op != PauliOp::I)
            .collect();
        v.sort_by_key(|(q, _)| *q);
        Self { ops: v }
    }

    /// Parse a label such as `"XIZ"`; the last character is qubit 0.
    pub fn from_label(label: &str) -> SimResult<Self> {
        let chars: Vec<char> = label.chars().collect();
        let n = chars.len();
        let mut ops = Vec::with_capacity(n);
        for (pos, c) in chars.into_iter().enumerate() {
            let op = PauliOp::from_char(c)
                .ok_or_else(|| SimError::InvalidPauliLabel(label.to_string()))?;
            ops.push(((n - 1 - pos) as u32, op));
        }
        Ok(Self::from_ops(ops))
    }

    /// Render the string as a label over `num_qubits` qubits.
    pub fn label(&self, num_qubits: u32) -> String {
        (0..num_qubits)
            .rev()
            .map(|q| self.op_on(q).as_char())
            .collect()
    }

    /// The operator acting on `qubit`.
    pub fn op_on(&self, qubit: u32) -> PauliOp {
        self.ops
            .binary_search_by_key(&qubit, |(q, _)| *q)
            .map_or(PauliOp::I, |i| self.ops[i].1)
    }

    /// Return the non-identity (qubit, op) pairs, sorted by qubit index.
    pub fn ops(&self) -> &[(u32, PauliOp)] {
        &self.ops
    }

    /// True if there are no non-identity operators.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// The highest qubit index referenced, or `None` for an identity string.
    pub fn max_qubit(&self) -> Option<u32> {
        self.ops.last().map(|(q, _)| *q)
    }

    /// Bit-mask form `(flip, phase, y_count)`.
    ///
    /// `flip` has a bit for every X or Y factor, `phase` for every Y or Z
    /// factor. Applied to a basis state, the string maps `|i⟩` to
    /// `i^y_count · (-1)^popcount(i & phase) · |i ^ flip⟩`.
    pub fn masks(&self) -> (usize, usize, u32) {
        let mut flip = 0usize;
        let mut phase = 0usize;
        let mut y_count = 0u32;
        for &(q, op) in &self.ops {
            let bit = 1usize << q;
            match op {
                PauliOp::X => flip |= bit,
                PauliOp::Y => {
                    flip |= bit;
                    phase |= bit;
                    y_count += 1;
                }
                PauliOp::Z => phase |= bit,
                PauliOp::I => {}
            }
        }
        (flip, phase, y_count)
    }
}

/// Action of a Pauli string on computational basis states.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BasisAction {
    flip: usize,
    phase: usize,
    global: Complex64,
}

impl BasisAction {
    pub(crate) fn new(pauli: &PauliString) -> Self {
        let (flip, phase, y_count) = pauli.masks();
        let global = match y_count % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        };
        Self { flip, phase, global }
    }

    /// `P|i⟩ = coefficient · |target⟩`.
    #[inline]
    pub(crate) fn apply(&self, index: usize) -> (usize, Complex64) {
        let sign = if (index & self.phase).count_ones() % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        (index ^ self.flip, self.global * sign)
    }
}

/// A single weighted Pauli term: `coeff · pauli`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauliTerm {
    /// Real coefficient.
    pub coeff: f64,
    /// The Pauli string.
    pub pauli: PauliString,
}

impl PauliTerm {
    /// Create a new term.
    pub fn new(coeff: f64, pauli: PauliString) -> Self {
        Self { coeff, pauli }
    }

    /// Create a term from a label, see [`PauliString::from_label`].
    pub fn from_label(coeff: f64, label: &str) -> SimResult<Self> {
        Ok(Self::new(coeff, PauliString::from_label(label)?))
    }
}

/// A real-weighted sum of Pauli strings on a fixed number of qubits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauliSum {
    terms: Vec<PauliTerm>,
}

impl PauliSum {
    /// Create from a list of terms.
    pub fn from_terms(terms: Vec<PauliTerm>) -> Self {
        Self { terms }
    }

    /// Create from `(label, coeff)` pairs.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = (&'a str, f64)>) -> SimResult<Self> {
        labels
            .into_iter()
            .map(|(label, coeff)| PauliTerm::from_label(coeff, label))
            .collect()
    }

    /// All terms.
    pub fn terms(&self) -> &[PauliTerm] {
        &self.terms
    }

    /// Number of terms.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// The minimum number of qubits required to represent this sum.
    ///
    /// Returns 0 if the sum is empty or purely identity.
    pub fn min_qubits(&self) -> u32 {
        self.terms
            .iter()
            .filter_map(|t| t.pauli.max_qubit())
            .max()
            .map_or(0, |q| q + 1)
    }
}

impl FromIterator<PauliTerm> for PauliSum {
    fn from_iter<T: IntoIterator<Item = PauliTerm>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_convention() {
        let p = PauliString::from_label("ZIX").unwrap();
        assert_eq!(p.ops(), &[(0, PauliOp::X), (2, PauliOp::Z)]);
        assert_eq!(p.op_on(1), PauliOp::I);
        assert_eq!(p.label(3), "ZIX");
        assert_eq!(p.label(4), "IZIX");
    }

    #[test]
    fn test_invalid_label() {
        assert!(matches!(
            PauliString::from_label("XA"),
            Err(SimError::InvalidPauliLabel(_))
        ));
    }

    #[test]
    fn test_identity_string() {
        let p = PauliString::from_label("III").unwrap();
        assert!(p.is_identity());
        assert_eq!(p.max_qubit(), None);
        assert_eq!(p.masks(), (0, 0, 0));
    }

    #[test]
    fn test_masks() {
        let p = PauliString::from_ops([(0, PauliOp::X), (1, PauliOp::Y), (2, PauliOp::Z)]);
        assert_eq!(p.masks(), (0b011, 0b110, 1));
    }

    #[test]
    fn test_basis_action_of_y() {
        let y = BasisAction::new(&PauliString::from_label("Y").unwrap());
        let (t0, c0) = y.apply(0);
        let (t1, c1) = y.apply(1);
        assert_eq!(t0, 1);
        assert_eq!(c0, Complex64::new(0.0, 1.0));
        assert_eq!(t1, 0);
        assert_eq!(c1, Complex64::new(0.0, -1.0));
    }

    #[test]
    fn test_sum_from_labels() {
        let sum = PauliSum::from_labels([("ZZI", 1.0), ("IXX", 0.5)]).unwrap();
        assert_eq!(sum.n_terms(), 2);
        assert_eq!(sum.min_qubits(), 3);
        assert_eq!(sum.terms()[1].coeff, 0.5);
    }
}
