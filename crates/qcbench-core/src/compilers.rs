//! Built-in compilers.
//!
//! All three wrap the `qcbench-compile` pass manager:
//!
//! | Id | Pipeline |
//! |----|----------|
//! | `translate` | basis translation (plus layout and routing on a device) |
//! | `peephole` | `translate` + single-qubit run merging + adjacent inverse cancellation |
//! | `fixpoint` | `translate`, then commutative merging, run merging and cancellation until the gate count stops falling |
//!
//! Without a target device the output basis is `{rx, ry, rz, h, cx}`.

use qcbench_compile::passes::{CancelAdjacent, CommutativeCancellation, Optimize1qGates};
use qcbench_compile::{BasisGates, PassManager, PassManagerBuilder, PropertySet};
use qcbench_ir::Circuit;
use tracing::debug;

use crate::devices::TargetDevice;
use crate::error::{CompilationError, RegistryResult};
use crate::provider::{CompileOutput, Compiler, CompilerArgs};
use crate::registry::RegistryBuilder;

/// Default bound on `fixpoint` optimization rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Basis used when no target device is given.
pub fn portable_basis() -> BasisGates {
    BasisGates::portable()
}

fn pipeline(level: u8, target: Option<&TargetDevice>) -> (PassManager, PropertySet) {
    let builder = PassManagerBuilder::new().with_optimization_level(level);
    let builder = match target {
        Some(device) => builder.with_target(device.coupling_map.clone(), device.basis_gates.clone()),
        None => builder.with_basis(portable_basis()),
    };
    builder.build()
}

fn run_pipeline(
    circuit: &Circuit,
    level: u8,
    target: Option<&TargetDevice>,
) -> Result<(Circuit, PropertySet, usize), CompilationError> {
    let (pm, mut props) = pipeline(level, target);
    let mut compiled = circuit.clone();
    pm.run(&mut compiled, &mut props)?;
    Ok((compiled, props, pm.len()))
}

fn reject_unknown_args(args: &CompilerArgs, allowed: &[&str]) -> Result<(), CompilationError> {
    match args.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(CompilationError::InvalidArgs(format!("unknown key '{key}'"))),
        None => Ok(()),
    }
}

/// Basis translation only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranslateCompiler;

impl Compiler for TranslateCompiler {
    fn id(&self) -> &str {
        "translate"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn validate_args(&self, args: &CompilerArgs) -> Result<(), CompilationError> {
        reject_unknown_args(args, &[])
    }

    fn compile(
        &self,
        circuit: &Circuit,
        args: &CompilerArgs,
        target: Option<&TargetDevice>,
    ) -> Result<CompileOutput, CompilationError> {
        self.validate_args(args)?;
        let (compiled, _, passes) = run_pipeline(circuit, 0, target)?;
        Ok(CompileOutput::new(compiled).with_metric("passes", passes as f64))
    }
}

/// Translation plus local peephole cleanup.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeepholeCompiler;

impl Compiler for PeepholeCompiler {
    fn id(&self) -> &str {
        "peephole"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn validate_args(&self, args: &CompilerArgs) -> Result<(), CompilationError> {
        reject_unknown_args(args, &[])
    }

    fn compile(
        &self,
        circuit: &Circuit,
        args: &CompilerArgs,
        target: Option<&TargetDevice>,
    ) -> Result<CompileOutput, CompilationError> {
        self.validate_args(args)?;
        let (compiled, _, passes) = run_pipeline(circuit, 2, target)?;
        Ok(CompileOutput::new(compiled).with_metric("passes", passes as f64))
    }
}

/// Translation followed by optimization rounds until the gate count is stable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixpointCompiler;

impl FixpointCompiler {
    fn max_rounds(args: &CompilerArgs) -> Result<usize, CompilationError> {
        match args.get("max_rounds") {
            None => Ok(DEFAULT_MAX_ROUNDS),
            Some(value) => value
                .as_u64()
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| {
                    CompilationError::InvalidArgs(format!(
                        "max_rounds must be a positive integer, got {value}"
                    ))
                }),
        }
    }
}

impl Compiler for FixpointCompiler {
    fn id(&self) -> &str {
        "fixpoint"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn validate_args(&self, args: &CompilerArgs) -> Result<(), CompilationError> {
        reject_unknown_args(args, &["max_rounds"])?;
        Self::max_rounds(args).map(|_| ())
    }

    fn compile(
        &self,
        circuit: &Circuit,
        args: &CompilerArgs,
        target: Option<&TargetDevice>,
    ) -> Result<CompileOutput, CompilationError> {
        self.validate_args(args)?;
        let max_rounds = Self::max_rounds(args)?;
        let (mut compiled, mut props, passes) = run_pipeline(circuit, 0, target)?;

        // Layout and routing already ran; only the optimization loop repeats.
        let mut optimize = PassManager::new();
        optimize.add_pass(CommutativeCancellation::new());
        optimize.add_pass(Optimize1qGates::new());
        optimize.add_pass(CancelAdjacent::new());
        let rounds = optimize.run_until_stable(&mut compiled, &mut props, max_rounds)?;
        debug!("fixpoint converged after {} rounds", rounds);

        Ok(CompileOutput::new(compiled)
            .with_metric("passes", (passes + optimize.len()) as f64)
            .with_metric("rounds", rounds as f64))
    }
}

pub(crate) fn register_builtins(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .register_compiler("translate", || Box::new(TranslateCompiler))?
        .register_compiler("peephole", || Box::new(PeepholeCompiler))?
        .register_compiler("fixpoint", || Box::new(FixpointCompiler))?;
    Ok(())
}
