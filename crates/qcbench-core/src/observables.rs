//! Built-in observables.
//!
//! Each observable maps a circuit width to an [`Operator`]. Pauli strings
//! are assembled position by position the way their labels read: label
//! position `i` of an `n`-qubit string acts on qubit `n - 1 - i`.

use std::collections::BTreeSet;

use qcbench_sim::{
    Operator, PauliOp, PauliString, PauliSum, PauliTerm, Projector, SimError, SimResult,
};

use crate::error::RegistryResult;
use crate::registry::RegistryBuilder;

/// Id of the square-lattice Heisenberg observable.
pub const HEISENBERG_ID: &str = "hamlib_heisenberg_pbc-qubitnodes_Lx_Ly_h-0.5";

/// Edges and weights of the 10-vertex Barabasi-Albert MAX-CUT instance.
pub const QAOA_WEIGHTED_EDGES: [(usize, usize, f64); 24] = [
    (0, 1, 6.720),
    (0, 2, 3.246),
    (1, 2, 6.462),
    (1, 3, 3.386),
    (1, 5, 5.014),
    (1, 6, 6.596),
    (2, 3, 8.579),
    (2, 4, 0.62),
    (2, 5, 0.708),
    (2, 6, 2.275),
    (2, 7, 5.0),
    (2, 8, 4.034),
    (3, 4, 4.987),
    (3, 6, 1.089),
    (3, 9, 2.961),
    (4, 5, 1.134),
    (4, 6, 6.865),
    (5, 6, 8.184),
    (5, 7, 9.459),
    (6, 7, 2.268),
    (6, 8, 8.197),
    (6, 9, 1.212),
    (7, 9, 4.265),
    (8, 9, 1.690),
];

/// A Pauli string from `(label position, op)` pairs.
fn positional(num_qubits: usize, ops: impl IntoIterator<Item = (usize, PauliOp)>) -> PauliString {
    PauliString::from_ops(
        ops.into_iter()
            .map(|(pos, op)| ((num_qubits - 1 - pos) as u32, op)),
    )
}

/// `Z` on every qubit.
pub fn computational_basis(num_qubits: usize) -> SimResult<Operator> {
    let all_z = PauliString::from_ops((0..num_qubits as u32).map(|q| (q, PauliOp::Z)));
    Ok(PauliSum::from_terms(vec![PauliTerm::new(1.0, all_z)]).into())
}

/// Projector onto `(|0...0> + |1...1>) / sqrt(2)`.
pub fn ghz_state_projector(num_qubits: usize) -> SimResult<Operator> {
    Ok(Projector::ghz(num_qubits)?.into())
}

/// Projector onto the uniform superposition.
pub fn uniform_superposition_projector(num_qubits: usize) -> SimResult<Operator> {
    Ok(Projector::uniform(num_qubits)?.into())
}

/// Projector onto the uniform superposition with a `-1` phase on `|1...1>`.
pub fn prep_select_all_ones(num_qubits: usize) -> SimResult<Operator> {
    let dim = 1usize << num_qubits;
    let amplitudes = (0..dim).map(|i| if i + 1 == dim { -1.0 } else { 1.0 });
    Ok(Projector::from_real(amplitudes)?.into())
}

/// Nearest-neighbour pairs of an `l x l` periodic lattice numbered in snake order.
///
/// Odd rows run right to left. Each pair is sorted and listed once.
pub fn lattice_pairs(l: usize) -> BTreeSet<(usize, usize)> {
    let node = |r: usize, c: usize| {
        if r % 2 == 1 { r * l + (l - 1 - c) } else { r * l + c }
    };
    let mut pairs = BTreeSet::new();
    for r in 0..l {
        for c in 0..l {
            let here = node(r, c);
            for there in [node(r, (c + 1) % l), node((r + 1) % l, c)] {
                pairs.insert((here.min(there), here.max(there)));
            }
        }
    }
    pairs
}

/// Square-lattice Heisenberg model with periodic boundaries and field `h = 0.5`.
///
/// `sum XX + YY + ZZ` over lattice neighbours plus `0.5 * sum Z`.
pub fn heisenberg(num_qubits: usize) -> SimResult<Operator> {
    let l = (num_qubits as f64).sqrt().floor() as usize;
    if num_qubits == 0 || l * l != num_qubits {
        return Err(SimError::UndefinedWidth {
            operator: HEISENBERG_ID.to_string(),
            num_qubits,
            reason: "the width must be a perfect square",
        });
    }

    let pairs = lattice_pairs(l);
    let mut terms = Vec::with_capacity(3 * pairs.len() + num_qubits);
    for op in [PauliOp::X, PauliOp::Y, PauliOp::Z] {
        for &(a, b) in &pairs {
            let ops = if a == b { vec![(a, op)] } else { vec![(a, op), (b, op)] };
            terms.push(PauliTerm::new(1.0, positional(num_qubits, ops)));
        }
    }
    for pos in 0..num_qubits {
        terms.push(PauliTerm::new(0.5, positional(num_qubits, [(pos, PauliOp::Z)])));
    }
    Ok(PauliSum::from_terms(terms).into())
}

/// Weighted MAX-CUT cost `sum w_ij Z_i Z_j` of the 10-vertex instance.
pub fn qaoa(num_qubits: usize) -> SimResult<Operator> {
    if num_qubits < 10 {
        return Err(SimError::UndefinedWidth {
            operator: "qaoa".to_string(),
            num_qubits,
            reason: "the graph has 10 vertices",
        });
    }
    let terms = QAOA_WEIGHTED_EDGES.iter().map(|&(i, j, w)| {
        PauliTerm::new(w, positional(num_qubits, [(i, PauliOp::Z), (j, PauliOp::Z)]))
    });
    Ok(terms.collect::<PauliSum>().into())
}

/// `sum Z X Z` over every window of three consecutive label positions.
pub fn qcnn(num_qubits: usize) -> SimResult<Operator> {
    let terms = (0..num_qubits.saturating_sub(2)).map(|i| {
        PauliTerm::new(
            1.0,
            positional(
                num_qubits,
                [(i, PauliOp::Z), (i + 1, PauliOp::X), (i + 2, PauliOp::Z)],
            ),
        )
    });
    Ok(terms.collect::<PauliSum>().into())
}

pub(crate) fn register_builtins(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .register_observable("computational_basis", computational_basis)?
        .register_observable("ghz_state_projector", ghz_state_projector)?
        .register_observable("uniform_superposition_projector", uniform_superposition_projector)?
        .register_observable("prep_select_all_ones", prep_select_all_ones)?
        .register_observable(HEISENBERG_ID, heisenberg)?
        .register_observable("qaoa", qaoa)?
        .register_observable("qcnn", qcnn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Observable;
    use qcbench_ir::{Circuit, QubitId};
    use qcbench_sim::Statevector;

    fn pauli(op: Operator) -> PauliSum {
        match op {
            Operator::Pauli(sum) => sum,
            Operator::Projector(_) => panic!("expected a Pauli sum"),
        }
    }

    fn labels(op: Operator, n: u32) -> Vec<String> {
        pauli(op).terms().iter().map(|t| t.pauli.label(n)).collect()
    }

    #[test]
    fn test_lattice_pairs_3x3() {
        let pairs = lattice_pairs(3);
        // 9 nodes, 2 neighbours each on a torus
        assert_eq!(pairs.len(), 18);
        // snake order: row 1 is 5 4 3, so 2 sits above 3
        assert!(pairs.contains(&(2, 3)));
        assert!(pairs.contains(&(0, 5)));
    }

    #[test]
    fn test_lattice_pairs_2x2_deduplicates_wraparound() {
        let pairs: Vec<_> = lattice_pairs(2).into_iter().collect();
        assert_eq!(pairs, vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_heisenberg_term_count() {
        let sum = pauli(heisenberg(9).unwrap());
        assert_eq!(sum.n_terms(), 3 * 18 + 9);
        let field: Vec<f64> = sum.terms().iter().rev().take(9).map(|t| t.coeff).collect();
        assert!(field.iter().all(|&c| c == 0.5));
    }

    #[test]
    fn test_heisenberg_rejects_non_square() {
        assert!(matches!(heisenberg(6), Err(SimError::UndefinedWidth { .. })));
        assert!(heisenberg(0).is_err());
    }

    #[test]
    fn test_qaoa_positions_map_to_high_qubits() {
        let first = labels(qaoa(10).unwrap(), 10).remove(0);
        assert_eq!(first, "ZZIIIIIIII");
        assert!(qaoa(9).is_err());
    }

    #[test]
    fn test_qcnn_windows() {
        assert_eq!(labels(qcnn(4).unwrap(), 4), vec!["ZXZI", "IZXZ"]);
        assert_eq!(pauli(qcnn(2).unwrap()).n_terms(), 0);
    }

    #[test]
    fn test_computational_basis_on_zero_state() {
        let state = Statevector::new(3).unwrap();
        let value = (computational_basis as fn(usize) -> SimResult<Operator>)
            .expectation(&state)
            .unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_prep_select_all_ones_overlap() {
        let mut circuit = Circuit::with_size("prep", 2, 0);
        circuit.h(QubitId(0)).unwrap().h(QubitId(1)).unwrap().cz(QubitId(0), QubitId(1)).unwrap();
        let state = Statevector::from_circuit(&circuit).unwrap();
        let value = (prep_select_all_ones as fn(usize) -> SimResult<Operator>)
            .expectation(&state)
            .unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }
}
