//! Circuit preprocessing shared by the simulation backends.

use qcbench_ir::{Circuit, Instruction, InstructionKind};

/// Instructions to simulate, with terminal measurements removed.
///
/// A measurement is terminal when no later instruction other than a
/// barrier acts on its qubit. Benchmarks usually end in `measure_all`, and
/// expectation values are taken on the state just before readout.
pub(crate) fn simulation_instructions(circuit: &Circuit) -> Vec<&Instruction> {
    let mut touched = vec![false; circuit.num_qubits()];
    let mut kept: Vec<&Instruction> = Vec::with_capacity(circuit.instructions().len());

    for inst in circuit.instructions().iter().rev() {
        match inst.kind {
            InstructionKind::Barrier => kept.push(inst),
            InstructionKind::Measure
                if inst.qubits.iter().all(|q| !touched[q.index()]) => {}
            _ => {
                for q in &inst.qubits {
                    touched[q.index()] = true;
                }
                kept.push(inst);
            }
        }
    }

    kept.reverse();
    kept
}
