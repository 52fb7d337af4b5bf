//! Layout passes for mapping logical qubits to physical qubits.

use qcbench_ir::Circuit;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PhysicalQubits, PropertySet};

/// Dense layout pass.
///
/// Picks a connected region of the device with exactly as many qubits as
/// the circuit, grown breadth-first from the lowest-numbered qubit that
/// admits one. The coupling map is then narrowed to that region and
/// relabelled so logical qubit `i` sits on region qubit `i`; the device
/// qubits are published as [`PhysicalQubits`]. Routing therefore works on
/// circuits that keep their own width.
pub struct DenseLayout;

impl Pass for DenseLayout {
    fn name(&self) -> &'static str {
        "DenseLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let required = circuit.num_qubits();
        let too_large = CompileError::CircuitTooLarge {
            required,
            available: coupling_map.num_qubits(),
        };
        if required > coupling_map.num_qubits() as usize {
            return Err(too_large);
        }

        let region = (0..coupling_map.num_qubits().max(1))
            .find_map(|start| coupling_map.connected_region(start, required))
            .ok_or(too_large)?;
        debug!("Dense layout region: {:?}", region);

        let narrowed = coupling_map.induced(&region);
        properties.coupling_map = Some(narrowed);
        properties.insert(PhysicalQubits(region));
        properties.layout = Some(Layout::trivial(required as u32));
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}
