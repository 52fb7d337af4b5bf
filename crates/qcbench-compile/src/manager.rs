//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use qcbench_ir::Circuit;

use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{
    BasicRouting, BasisTranslation, CancelAdjacent, CommutativeCancellation, DenseLayout,
    Optimize1qGates,
};
use crate::property::{BasisGates, CouplingMap, PropertySet};

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given circuit.
    #[instrument(skip(self, circuit, properties))]
    pub fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            circuit.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(circuit, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(circuit, properties)?;
                debug!("Pass {} completed, gates: {}", pass.name(), circuit.gate_count());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, gates: {}",
            circuit.depth(),
            circuit.gate_count()
        );

        Ok(())
    }

    /// Run the passes repeatedly until the gate count stops decreasing.
    ///
    /// At most `max_rounds` rounds are run (at least one). Returns the
    /// number of rounds executed.
    #[instrument(skip(self, circuit, properties))]
    pub fn run_until_stable(
        &self,
        circuit: &mut Circuit,
        properties: &mut PropertySet,
        max_rounds: usize,
    ) -> CompileResult<usize> {
        let mut rounds = 0;
        loop {
            let before = circuit.gate_count();
            self.run(circuit, properties)?;
            rounds += 1;
            let after = circuit.gate_count();
            debug!("Round {}: {} -> {} gates", rounds, before, after);
            if after >= before || rounds >= max_rounds.max(1) {
                break;
            }
        }
        Ok(rounds)
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    /// Target properties.
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            properties: PropertySet::new(),
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: Only required transformations
    /// - Level 1: Single-qubit run merging (default)
    /// - Level 2: + Adjacent inverse cancellation
    /// - Level 3: + Commutative rotation merging and a second cleanup sweep
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set the target properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Set the basis gates without a coupling map.
    #[must_use]
    pub fn with_basis(mut self, basis_gates: BasisGates) -> Self {
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();
        let has_map = self.properties.coupling_map.is_some();
        let has_basis = self.properties.basis_gates.is_some();

        if has_map {
            pm.add_pass(DenseLayout);
        }
        if has_basis {
            pm.add_pass(BasisTranslation);
        }
        if has_map {
            // Routing needs two-qubit gates; the SWAPs it adds are translated again.
            pm.add_pass(BasicRouting);
            if has_basis {
                pm.add_pass(BasisTranslation);
            }
        }

        if self.optimization_level >= 1 {
            pm.add_pass(Optimize1qGates::new());
        }
        if self.optimization_level >= 2 {
            pm.add_pass(CancelAdjacent::new());
        }
        if self.optimization_level >= 3 {
            pm.add_pass(CommutativeCancellation::new());
            pm.add_pass(Optimize1qGates::new());
            pm.add_pass(CancelAdjacent::new());
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
