//! Adjacent inverse-pair cancellation.

use std::mem::discriminant;

use qcbench_ir::{Circuit, Instruction, StandardGate};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::EPSILON;

/// Cancels adjacent gate pairs whose product is the identity.
///
/// Two gates are adjacent when no other instruction touches any of their
/// qubits in between. Pairs are found with one stack of surviving
/// instructions per qubit, so removing a pair exposes the gates around it
/// and nested pairs such as `H CX CX H` cancel in a single sweep.
pub struct CancelAdjacent;

impl CancelAdjacent {
    /// Create a new cancellation pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CancelAdjacent {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `b` undoes `a`.
fn is_inverse_pair(a: &StandardGate, b: &StandardGate) -> bool {
    let inv = a.inverse();
    discriminant(&inv) == discriminant(b)
        && inv
            .parameters()
            .iter()
            .zip(b.parameters().iter())
            .all(|(x, y)| (x - y).abs() < EPSILON)
}

impl Pass for CancelAdjacent {
    fn name(&self) -> &'static str {
        "CancelAdjacent"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut out: Vec<Option<Instruction>> = Vec::with_capacity(circuit.instructions().len());
        let mut stacks: Vec<Vec<usize>> = vec![vec![]; circuit.num_qubits()];
        let mut cancelled = 0usize;

        for inst in circuit.instructions() {
            if let Some(gate) = inst.as_plain_standard() {
                let top = inst
                    .qubits
                    .first()
                    .and_then(|q| stacks[q.index()].last().copied());
                let partner = top.filter(|&j| {
                    inst.qubits
                        .iter()
                        .all(|q| stacks[q.index()].last() == Some(&j))
                        && out[j].as_ref().is_some_and(|prev| {
                            prev.qubits == inst.qubits
                                && prev
                                    .as_plain_standard()
                                    .is_some_and(|p| is_inverse_pair(p, gate))
                        })
                });
                if let Some(j) = partner {
                    out[j] = None;
                    for q in &inst.qubits {
                        stacks[q.index()].pop();
                    }
                    cancelled += 1;
                    continue;
                }
            }
            let index = out.len();
            for q in &inst.qubits {
                stacks[q.index()].push(index);
            }
            out.push(Some(inst.clone()));
        }

        if cancelled > 0 {
            *circuit = circuit.with_instructions(out.into_iter().flatten())?;
        }
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit, _properties: &PropertySet) -> bool {
        circuit.gate_count() > 1
    }
}
