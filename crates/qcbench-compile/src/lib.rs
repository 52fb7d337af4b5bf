//! qcbench compilation and synthesis
//!
//! This crate provides the transpiler behind the built-in compiler
//! providers and the exact unitary synthesis used to grow circuits before
//! benchmarking. Compilation is pass based: each pass rewrites the circuit's
//! ordered instruction list and shares target information through a
//! [`PropertySet`].
//!
//! # Overview
//!
//! 1. **Layout**: pick a connected device region as wide as the circuit
//! 2. **Translation**: rewrite gates into the target basis
//! 3. **Routing**: insert SWAPs so every two-qubit gate is on a device edge
//! 4. **Optimization**: shrink the gate count without changing the unitary
//!
//! # Architecture
//!
//! ```text
//! Input Circuit
//!       |
//!       v
//! +-------------+
//! | PassManager | <-- PropertySet (coupling map, basis gates, layout)
//! +-------------+
//!       |
//!       +-- DenseLayout
//!       +-- BasisTranslation
//!       +-- BasicRouting + BasisTranslation
//!       +-- Optimize1qGates / CancelAdjacent / CommutativeCancellation
//!       |
//!       v
//! Output Circuit (basis gates on device edges)
//! ```
//!
//! # Example: Basic Compilation
//!
//! ```rust
//! use qcbench_compile::{BasisGates, CouplingMap, PassManagerBuilder};
//! use qcbench_ir::Circuit;
//!
//! let mut circuit = Circuit::bell().unwrap();
//!
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_optimization_level(2)
//!     .with_target(CouplingMap::linear(5), BasisGates::ibm())
//!     .build();
//!
//! pm.run(&mut circuit, &mut props).unwrap();
//! assert!(circuit.instructions().iter().all(|i| {
//!     !i.is_gate() || ["rz", "sx", "x", "cx"].contains(&i.name())
//! }));
//! ```
//!
//! # Optimization Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | Layout, translation and routing only |
//! | 1 | + Single-qubit run merging |
//! | 2 | + Adjacent inverse cancellation |
//! | 3 | + Commutative rotation merging and a second cleanup sweep |
//!
//! # Synthesis
//!
//! [`synthesis::synthesize_unitary`] turns a dense unitary into gates:
//! a two-level (Givens) decomposition for any width, or the KAK
//! decomposition for two-qubit blocks. [`synthesis::haar_unitary`] draws
//! seeded random unitaries.
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use qcbench_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use qcbench_ir::Circuit;
//!
//! struct MyCustomPass;
//!
//! impl Pass for MyCustomPass {
//!     fn name(&self) -> &str { "my_custom_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, circuit: &mut Circuit, props: &mut PropertySet) -> CompileResult<()> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod manager;
pub mod matrix;
pub mod pass;
pub mod property;
pub mod synthesis;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use matrix::{Matrix, apply_local, circuit_unitary, gate_matrix};
pub use pass::{Pass, PassKind};
pub use property::{BasisGates, CouplingMap, Layout, PhysicalQubits, PropertySet};
pub use synthesis::UnitarySynthesis;
pub use unitary::Unitary2x2;
