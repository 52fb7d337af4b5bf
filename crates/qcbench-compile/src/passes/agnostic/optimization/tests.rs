//! Tests for optimization passes.

use std::f64::consts::PI;

use qcbench_ir::{Circuit, ClassicalCondition, ClbitId, Gate, Instruction, QubitId, StandardGate};

use crate::matrix::circuit_unitary;
use crate::pass::Pass;
use crate::property::{BasisGates, PropertySet};
use crate::unitary::Unitary2x2;

use super::{CancelAdjacent, CommutativeCancellation, OneQubitBasis, Optimize1qGates};

fn run_pass(pass: &dyn Pass, circuit: &Circuit, props: &mut PropertySet) -> Circuit {
    let mut out = circuit.clone();
    pass.run(&mut out, props).unwrap();
    out
}

fn assert_equivalent(a: &Circuit, b: &Circuit) {
    let ua = circuit_unitary(a).unwrap();
    let ub = circuit_unitary(b).unwrap();
    assert!(ua.max_diff(&ub) < 1e-9, "circuits differ");
}

// =============================================================================
// Optimize1qGates
// =============================================================================

#[test]
fn test_optimize_1q_hh_cancels() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let out = run_pass(&Optimize1qGates::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 0);
}

#[test]
fn test_optimize_1q_reduces_count_and_keeps_phase() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit
        .h(QubitId(0))
        .unwrap()
        .t(QubitId(0))
        .unwrap()
        .t(QubitId(0))
        .unwrap()
        .h(QubitId(0))
        .unwrap();

    let mut props = PropertySet::new().with_basis(BasisGates::portable());
    let out = run_pass(&Optimize1qGates::new(), &circuit, &mut props);
    assert!(out.gate_count() <= 3);
    assert!(out.instructions().iter().all(|i| matches!(i.name(), "rz" | "ry")));
    assert_equivalent(&circuit, &out);
}

#[test]
fn test_optimize_1q_respects_two_qubit_boundaries() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .h(QubitId(0))
        .unwrap()
        .s(QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .sdg(QubitId(0))
        .unwrap()
        .h(QubitId(0))
        .unwrap();

    let out = run_pass(&Optimize1qGates::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.two_qubit_gate_count(), 1);
    assert_eq!(out.gate_count(), 3);
    assert_equivalent(&circuit, &out);
}

#[test]
fn test_optimize_1q_skips_conditioned_gates() {
    let mut circuit = Circuit::with_size("test", 1, 1);
    let cond = Gate::from(StandardGate::X).with_condition(ClassicalCondition::new("c", 1));
    circuit.h(QubitId(0)).unwrap();
    circuit.push(Instruction::gate(cond, [QubitId(0)])).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();

    let out = run_pass(&Optimize1qGates::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.instructions(), circuit.instructions());
}

#[test]
fn test_optimize_1q_only_replaces_when_shorter() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();

    let mut props = PropertySet::new().with_basis(BasisGates::ibm());
    let out = run_pass(&Optimize1qGates::new(), &circuit, &mut props);
    assert_eq!(out.instructions(), circuit.instructions());
}

#[test]
fn test_one_qubit_basis_selection() {
    assert_eq!(
        OneQubitBasis::from_basis(&BasisGates::cx_u()),
        Some(OneQubitBasis::U3)
    );
    assert_eq!(
        OneQubitBasis::from_basis(&BasisGates::ibm()),
        Some(OneQubitBasis::ZSX)
    );
    assert_eq!(
        OneQubitBasis::from_basis(&BasisGates::portable()),
        Some(OneQubitBasis::ZYZ)
    );
    assert_eq!(OneQubitBasis::from_basis(&BasisGates::new(["h", "cx"])), None);
}

#[test]
fn test_one_qubit_basis_synthesis() {
    let targets = [
        Unitary2x2::h(),
        Unitary2x2::u(0.4, 1.2, -2.2),
        Unitary2x2::rz(0.9),
        Unitary2x2::ry(PI / 2.0) * Unitary2x2::rz(0.3),
        Unitary2x2::x(),
    ];
    for basis in [OneQubitBasis::U3, OneQubitBasis::ZSX, OneQubitBasis::ZYZ] {
        for u in &targets {
            let product = basis
                .synthesize(u)
                .iter()
                .filter_map(Unitary2x2::from_standard)
                .fold(Unitary2x2::identity(), |acc, g| g * acc);
            assert!(product.equiv(u), "{basis:?} failed for {u:?}");
        }
    }
    assert_eq!(OneQubitBasis::ZSX.synthesize(&Unitary2x2::rz(0.5)).len(), 1);
    assert!(OneQubitBasis::ZYZ.synthesize(&Unitary2x2::identity()).is_empty());
}

// =============================================================================
// CancelAdjacent
// =============================================================================

#[test]
fn test_cancel_adjacent_cx() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let out = run_pass(&CancelAdjacent::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 0);
}

#[test]
fn test_cancel_adjacent_nested() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .h(QubitId(0))
        .unwrap()
        .s(QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .sdg(QubitId(1))
        .unwrap()
        .h(QubitId(0))
        .unwrap();

    let out = run_pass(&CancelAdjacent::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 0);
}

#[test]
fn test_cancel_adjacent_blocked() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .h(QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .cx(QubitId(1), QubitId(0))
        .unwrap()
        .rz(0.5, QubitId(0))
        .unwrap()
        .rz(-0.4, QubitId(0))
        .unwrap();

    let out = run_pass(&CancelAdjacent::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.instructions(), circuit.instructions());
}

#[test]
fn test_cancel_adjacent_parametrized_inverse() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .rzz(0.7, QubitId(0), QubitId(1))
        .unwrap()
        .rzz(-0.7, QubitId(0), QubitId(1))
        .unwrap()
        .u(0.3, 0.2, 0.1, QubitId(0))
        .unwrap()
        .u(-0.3, -0.1, -0.2, QubitId(0))
        .unwrap();

    let out = run_pass(&CancelAdjacent::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 0);
}

#[test]
fn test_cancel_adjacent_stops_at_barrier() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.x(QubitId(0)).unwrap();
    circuit.barrier([QubitId(0)]).unwrap();
    circuit.x(QubitId(0)).unwrap();

    let out = run_pass(&CancelAdjacent::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 2);
}

// =============================================================================
// CommutativeCancellation
// =============================================================================

#[test]
fn test_commutative_merges_rz_through_control() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .rz(0.3, QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .rz(0.4, QubitId(0))
        .unwrap();

    let out = run_pass(&CommutativeCancellation::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 2);
    assert_equivalent(&circuit, &out);
}

#[test]
fn test_commutative_merges_rx_through_target() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .rx(0.3, QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .rx(-0.3, QubitId(1))
        .unwrap();

    let out = run_pass(&CommutativeCancellation::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 1);
    assert_eq!(out.instructions()[0].name(), "cx");
    assert_equivalent(&circuit, &out);
}

#[test]
fn test_commutative_does_not_cross_target_for_z() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit
        .rz(0.3, QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .rz(0.4, QubitId(1))
        .unwrap();

    let out = run_pass(&CommutativeCancellation::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 3);
}

#[test]
fn test_commutative_full_turn_adds_phase() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(PI, QubitId(0)).unwrap();
    circuit.t(QubitId(0)).unwrap();
    circuit.rz(PI, QubitId(0)).unwrap();

    let out = run_pass(&CommutativeCancellation::new(), &circuit, &mut PropertySet::new());
    assert_eq!(out.gate_count(), 1);
    assert!((out.global_phase() - PI).abs() < 1e-12);
    assert_equivalent(&circuit, &out);
}
