//! Routing passes for inserting SWAP gates.

use std::collections::VecDeque;

use qcbench_ir::{Circuit, Instruction, InstructionKind, QubitId, StandardGate};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

/// Basic routing pass.
///
/// Rewrites the circuit onto physical qubits in program order. A two-qubit
/// gate on non-adjacent qubits is preceded by SWAPs that walk its first
/// operand along a shortest path towards the second. After the last
/// instruction the initial layout is restored with SWAPs along a spanning
/// tree, so the routed circuit implements the same unitary as its input.
///
/// The coupling map must have exactly as many qubits as the circuit, which
/// is what [`DenseLayout`](super::DenseLayout) establishes.
pub struct BasicRouting;

impl Pass for BasicRouting {
    fn name(&self) -> &'static str {
        "BasicRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let initial = properties
            .layout
            .as_ref()
            .ok_or(CompileError::MissingLayout)?
            .clone();

        if coupling_map.num_qubits() as usize != circuit.num_qubits() {
            return Err(CompileError::InvalidConfiguration(format!(
                "coupling map has {} qubits but the circuit has {}; run DenseLayout first",
                coupling_map.num_qubits(),
                circuit.num_qubits()
            )));
        }

        let mut layout = initial.clone();
        let mut out = Vec::with_capacity(circuit.instructions().len());
        let mut swaps = 0usize;

        for inst in circuit.instructions() {
            let is_gate = matches!(inst.kind, InstructionKind::Gate(_));
            if is_gate && inst.qubits.len() > 2 {
                return Err(CompileError::UnroutableGate {
                    gate: inst.name().to_string(),
                    num_qubits: inst.qubits.len(),
                });
            }

            if is_gate && inst.qubits.len() == 2 {
                let p0 = physical(&layout, inst.qubits[0])?;
                let p1 = physical(&layout, inst.qubits[1])?;
                if !coupling_map.is_connected(p0, p1) {
                    let path = coupling_map
                        .shortest_path(p0, p1)
                        .ok_or(CompileError::RoutingFailed { qubit1: p0, qubit2: p1 })?;
                    for hop in path.windows(2).take(path.len().saturating_sub(2)) {
                        out.push(swap(hop[0], hop[1]));
                        layout.swap(hop[0], hop[1]);
                        swaps += 1;
                    }
                }
            }

            let mut mapped = inst.clone();
            for q in &mut mapped.qubits {
                *q = QubitId(physical(&layout, *q)?);
            }
            out.push(mapped);
        }

        let restore = restore_layout(coupling_map, &layout, &initial)?;
        debug!(
            "BasicRouting inserted {} SWAPs and {} to restore the layout",
            swaps,
            restore.len()
        );
        out.extend(restore);

        *circuit = circuit.with_instructions(out)?;
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.layout.is_some()
    }
}

fn physical(layout: &Layout, qubit: QubitId) -> CompileResult<u32> {
    layout.get_physical(qubit).ok_or(CompileError::MissingLayout)
}

fn swap(p1: u32, p2: u32) -> Instruction {
    Instruction::two_qubit_gate(StandardGate::Swap, QubitId(p1), QubitId(p2))
}

/// SWAPs that move every logical qubit from `current` back to `target`.
///
/// Tokens are routed on a BFS spanning tree rooted at qubit 0. Nodes are
/// settled deepest first; the token owed to a node travels along the tree
/// path, which only crosses unsettled nodes, so settled nodes never move
/// again.
fn restore_layout(
    coupling_map: &CouplingMap,
    current: &Layout,
    target: &Layout,
) -> CompileResult<Vec<Instruction>> {
    let n = coupling_map.num_qubits();
    let mut out = Vec::new();
    if n == 0 || current == target {
        return Ok(out);
    }

    let mut parent: Vec<Option<u32>> = vec![None; n as usize];
    let mut order = vec![0u32];
    let mut seen = vec![false; n as usize];
    seen[0] = true;
    let mut queue = VecDeque::from([0u32]);
    while let Some(node) = queue.pop_front() {
        let mut next: Vec<u32> = coupling_map.neighbors(node).collect();
        next.sort_unstable();
        for nb in next {
            if !seen[nb as usize] {
                seen[nb as usize] = true;
                parent[nb as usize] = Some(node);
                order.push(nb);
                queue.push_back(nb);
            }
        }
    }

    let ancestors = |mut node: u32| {
        let mut chain = vec![node];
        while let Some(p) = parent[node as usize] {
            chain.push(p);
            node = p;
        }
        chain
    };

    let mut layout = current.clone();
    for &node in order.iter().rev() {
        let Some(owner) = target.get_logical(node) else {
            continue;
        };
        let from = physical(&layout, owner)?;
        if from == node {
            continue;
        }
        if !seen[from as usize] {
            return Err(CompileError::RoutingFailed { qubit1: from, qubit2: node });
        }

        let up = ancestors(from);
        let down = ancestors(node);
        let lca_pos = up
            .iter()
            .position(|a| down.contains(a))
            .ok_or(CompileError::RoutingFailed { qubit1: from, qubit2: node })?;
        let lca = up[lca_pos];
        let mut path: Vec<u32> = up[..=lca_pos].to_vec();
        let down_pos = down.iter().position(|&a| a == lca).unwrap_or(0);
        path.extend(down[..down_pos].iter().rev());

        for hop in path.windows(2) {
            out.push(swap(hop[0], hop[1]));
            layout.swap(hop[0], hop[1]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::circuit_unitary;
    use crate::passes::DenseLayout;
    use crate::property::BasisGates;

    fn route(circuit: &Circuit, map: CouplingMap) -> Circuit {
        let mut props = PropertySet::new().with_target(map, BasisGates::cx_u());
        let mut routed = circuit.clone();
        DenseLayout.run(&mut routed, &mut props).unwrap();
        BasicRouting.run(&mut routed, &mut props).unwrap();
        let map = props.coupling_map.as_ref().unwrap();
        for inst in routed.instructions() {
            if inst.qubits.len() == 2 && inst.is_gate() {
                assert!(map.is_connected(inst.qubits[0].0, inst.qubits[1].0));
            }
        }
        routed
    }

    #[test]
    fn test_routing_adjacent_unchanged() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();

        let routed = route(&circuit, CouplingMap::linear(3));
        assert_eq!(routed.instructions(), circuit.instructions());
    }

    #[test]
    fn test_routing_inserts_swaps_in_order() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(3))
            .unwrap()
            .rz(0.4, QubitId(3))
            .unwrap()
            .cx(QubitId(1), QubitId(3))
            .unwrap();

        let routed = route(&circuit, CouplingMap::linear(4));
        assert!(routed.instructions().iter().any(|i| i.name() == "swap"));
        let a = circuit_unitary(&circuit).unwrap();
        let b = circuit_unitary(&routed).unwrap();
        assert!(a.max_diff(&b) < 1e-9);
    }

    #[test]
    fn test_routing_restores_layout_on_grid() {
        let mut circuit = Circuit::with_size("test", 6, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(5))
            .unwrap()
            .cx(QubitId(2), QubitId(3))
            .unwrap()
            .cx(QubitId(4), QubitId(1))
            .unwrap()
            .t(QubitId(4))
            .unwrap();

        let routed = route(&circuit, CouplingMap::grid(2, 3));
        let a = circuit_unitary(&circuit).unwrap();
        let b = circuit_unitary(&routed).unwrap();
        assert!(a.max_diff(&b) < 1e-9);
    }

    #[test]
    fn test_routing_rejects_three_qubit_gate() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let mut props = PropertySet::new()
            .with_target(CouplingMap::linear(3), BasisGates::cx_u())
            .with_layout(Layout::trivial(3));
        let err = BasicRouting.run(&mut circuit, &mut props);
        assert!(matches!(err, Err(CompileError::UnroutableGate { .. })));
    }

    #[test]
    fn test_routing_requires_layout() {
        let circuit = Circuit::with_size("test", 2, 0);
        let props = PropertySet::new().with_target(CouplingMap::linear(2), BasisGates::cx_u());
        assert!(!BasicRouting.should_run(&circuit, &props));
    }
}
