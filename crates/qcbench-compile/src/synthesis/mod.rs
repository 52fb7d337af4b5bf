//! Exact synthesis of dense unitaries into gates.
//!
//! - [`two_level`]: Givens (two-level) decomposition for any number of qubits
//! - [`kak`]: canonical decomposition of two-qubit unitaries
//! - [`controlled`]: ABC construction and multi-controlled gate lowering
//! - [`random`]: Haar-random unitaries for seeded circuit growth

pub mod controlled;
pub mod kak;
pub mod random;
pub mod two_level;

use qcbench_ir::{Instruction, QubitId};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::matrix::Matrix;
use crate::synthesis::controlled::u_gate;

pub use kak::{KakDecomposition, kak_decompose};
pub use random::haar_unitary;
pub use two_level::{TwoLevelUnitary, two_level_factors};

/// Tolerance used when checking that a matrix to synthesize is unitary.
const UNITARITY_TOLERANCE: f64 = 1e-8;

/// How two-qubit unitaries are synthesized.
///
/// Single-qubit unitaries always become one `u` gate and unitaries on three
/// or more qubits always use the two-level decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitarySynthesis {
    /// Two-level decomposition into `u`, `p`, `x`, `cx` and `ccx`.
    #[default]
    TwoLevel,
    /// KAK decomposition into `u`, `rxx`, `ryy` and `rzz`.
    Kak,
}

/// Synthesize `matrix` on `qubits` (bit `k` of the matrix index is `qubits[k]`).
///
/// The result equals `matrix` up to a global phase.
pub fn synthesize_unitary(
    matrix: &Matrix,
    qubits: &[QubitId],
    method: UnitarySynthesis,
) -> CompileResult<Vec<Instruction>> {
    if qubits.is_empty() || matrix.dim() != 1 << qubits.len() {
        return Err(CompileError::InvalidMatrix(format!(
            "{0}x{0} matrix cannot act on {1} qubits",
            matrix.dim(),
            qubits.len()
        )));
    }
    if !matrix.is_unitary(UNITARITY_TOLERANCE) {
        return Err(CompileError::InvalidMatrix("matrix is not unitary".into()));
    }

    match (qubits, method) {
        ([q], _) => {
            let u = matrix
                .to_2x2()
                .ok_or_else(|| CompileError::InvalidMatrix("expected a 2x2 matrix".into()))?;
            Ok(u_gate(&u, *q).into_iter().collect())
        }
        ([q0, q1], UnitarySynthesis::Kak) => kak::decompose(matrix, *q0, *q1),
        _ => two_level::decompose(matrix, qubits),
    }
}
