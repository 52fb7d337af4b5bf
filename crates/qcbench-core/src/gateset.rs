//! Post-compilation gate-set check.

use std::collections::BTreeSet;

use qcbench_compile::BasisGates;
use qcbench_ir::{Circuit, InstructionKind};

use crate::compilers::portable_basis;
use crate::devices::TargetDevice;
use crate::error::CompilationError;

/// Basis a compiled circuit must be expressed in: the device basis when a
/// device is targeted, the portable basis otherwise.
pub fn allowed_basis(target: Option<&TargetDevice>) -> BasisGates {
    target.map_or_else(portable_basis, |device| device.basis_gates.clone())
}

/// Reject circuits containing gates outside `basis`.
///
/// Measurements, resets, barriers and delays are always allowed.
/// Classically conditioned gates are treated as control flow and accepted.
pub fn check_gate_set(circuit: &Circuit, basis: &BasisGates) -> Result<(), CompilationError> {
    let mut offending = BTreeSet::new();
    for inst in circuit.instructions() {
        if let InstructionKind::Gate(gate) = &inst.kind {
            if gate.condition.is_none() && !basis.contains(inst.name()) {
                offending.insert(inst.name().to_string());
            }
        }
    }
    if offending.is_empty() {
        Ok(())
    } else {
        Err(CompilationError::GateSet {
            gates: offending.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcbench_ir::{ClassicalCondition, ClbitId, Gate, Instruction, QubitId, StandardGate};

    #[test]
    fn test_accepts_portable_circuit() {
        let mut circuit = Circuit::with_size("ok", 2, 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .reset(QubitId(1))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .rx(0.1, QubitId(0))
            .unwrap()
            .ry(0.2, QubitId(1))
            .unwrap()
            .rz(0.3, QubitId(0))
            .unwrap()
            .barrier_all()
            .unwrap()
            .delay(QubitId(0), 10)
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap();
        let conditioned = Gate::standard(StandardGate::X)
            .with_condition(ClassicalCondition::new("c", 1));
        circuit
            .push(Instruction::gate(conditioned, [QubitId(1)]))
            .unwrap();

        assert!(check_gate_set(&circuit, &portable_basis()).is_ok());
    }

    #[test]
    fn test_rejects_t() {
        let mut circuit = Circuit::with_size("bad", 1, 0);
        circuit.h(QubitId(0)).unwrap().t(QubitId(0)).unwrap();

        let err = check_gate_set(&circuit, &portable_basis()).unwrap_err();
        match err {
            CompilationError::GateSet { gates } => assert_eq!(gates, vec!["t".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_device_basis() {
        let device = crate::devices::heavy_hex_27();
        let basis = allowed_basis(Some(&device));
        assert!(!basis.contains("h"));

        let mut circuit = Circuit::with_size("h", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        assert!(check_gate_set(&circuit, &basis).is_err());
        assert!(check_gate_set(&circuit, &allowed_basis(None)).is_ok());
    }
}
