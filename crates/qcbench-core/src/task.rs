//! The body of one benchmark task.
//!
//! A task loads its circuit, optionally grows it with the unoptimizer,
//! compiles it, checks the output and optionally simulates both versions.
//! It always produces exactly one [`BenchmarkResult`]; every failure up to
//! and including compilation marks the result failed, while a simulation
//! failure only records `simulation_error`.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use qcbench_ir::Circuit;
use qcbench_sim::{DensityMatrix, MAX_DENSITY_MATRIX_QUBITS, Statevector};

use crate::error::{CompilationError, TaskResult};
use crate::gateset::{allowed_basis, check_gate_set};
use crate::registry::{ProviderKind, Registry};
use crate::results::{BenchmarkResult, SimulationMetrics, TaskStatus};
use crate::suite::{BenchmarkSpec, CompilerSpec, SimulationSpec};
use crate::unoptimize::{UnoptimizationConfig, unoptimize};

/// Everything a worker needs to run one task. Crosses the process boundary
/// as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Position in the expanded task list.
    pub index: usize,
    /// Suite the task belongs to.
    pub suite_id: String,
    /// Compiler under test.
    pub compiler: CompilerSpec,
    /// Benchmark circuit, with its path already resolved.
    pub benchmark: BenchmarkSpec,
    /// Target device, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<String>,
    /// Unoptimization settings when the stage is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unoptimization: Option<UnoptimizationConfig>,
    /// Output metrics evaluated after compilation.
    #[serde(default)]
    pub output_metrics: Vec<String>,
}

/// Run one task to completion.
#[instrument(
    skip(task, registry),
    fields(
        index = task.index,
        compiler = %task.compiler.id,
        benchmark = %task.benchmark.id,
    )
)]
pub fn run_task(task: &TaskDescriptor, registry: &Registry) -> BenchmarkResult {
    let mut result = BenchmarkResult::pending(task);
    match execute(task, registry, &mut result) {
        Ok(()) => {
            result.status = TaskStatus::Succeeded;
            debug!("Task succeeded");
        }
        Err(err) => {
            warn!("Task failed: {err}");
            result.fail(&err);
        }
    }
    result.metadata.finished_at = Utc::now();
    result
}

fn execute(task: &TaskDescriptor, registry: &Registry, result: &mut BenchmarkResult) -> TaskResult<()> {
    let mut circuit = qcbench_qasm::parse_file(task.benchmark.circuit_path())?;

    if let Some(config) = task.unoptimization.as_ref().filter(|c| c.enabled) {
        let (grown, report) = unoptimize(&circuit, config)?;
        for warning in &report.warnings {
            warn!("{warning}");
        }
        result.unoptimization = Some(report);
        circuit = grown;
    }

    let metrics = &mut result.compilation;
    metrics.raw_gate_count = circuit.gate_count();
    metrics.raw_two_qubit_gate_count = circuit.two_qubit_gate_count();
    metrics.raw_depth = circuit.depth();

    let compiler = registry.compiler(&task.compiler.id)?;
    result.compiler_version = compiler.version().to_string();
    let target = task
        .target_device_id
        .as_deref()
        .map(|id| registry.target_device(id))
        .transpose()?;

    let start = Instant::now();
    let compiled = compiler.compile(&circuit, &task.compiler.compiler_args, target.as_deref());
    let metrics = &mut result.compilation;
    metrics.wall_time_seconds = start.elapsed().as_secs_f64();
    let output = compiled?;

    // Routed circuits keep their logical width.
    if output.circuit.num_qubits() != circuit.num_qubits() {
        return Err(CompilationError::WidthChanged {
            expected: circuit.num_qubits(),
            actual: output.circuit.num_qubits(),
        }
        .into());
    }
    check_gate_set(&output.circuit, &allowed_basis(target.as_deref()))?;

    metrics.success = true;
    metrics.gate_count = output.circuit.gate_count();
    metrics.two_qubit_gate_count = output.circuit.two_qubit_gate_count();
    metrics.depth = output.circuit.depth();
    metrics.compiler_metrics = output.metrics;
    for id in &task.output_metrics {
        let metric = registry.output_metric(id)?;
        metrics
            .output_metrics
            .insert(id.clone(), metric.compute(&output.circuit, &circuit));
    }
    debug!(
        "Compiled in {:.3}s: {} -> {} gates",
        metrics.wall_time_seconds, metrics.raw_gate_count, metrics.gate_count
    );

    if let Some(spec) = &task.benchmark.simulate {
        match simulate(spec, &circuit, &output.circuit, registry) {
            Ok(values) => result.simulation = Some(values),
            Err(err) => {
                warn!("Simulation failed: {err}");
                result.simulation_error = Some(err.to_string());
            }
        }
    }
    Ok(())
}

/// Evaluate the benchmark's measurement on the uncompiled and compiled
/// circuits.
fn simulate(
    spec: &SimulationSpec,
    uncompiled: &Circuit,
    compiled: &Circuit,
    registry: &Registry,
) -> TaskResult<SimulationMetrics> {
    let mut values = SimulationMetrics::default();

    if !registry.contains(ProviderKind::Observable, &spec.measurement) {
        let metric = registry.output_metric(&spec.measurement)?;
        values.insert(spec.measurement.clone(), metric.compute(compiled, uncompiled));
        return Ok(values);
    }

    let observable = registry.observable(&spec.measurement)?;
    let ideal = Statevector::from_circuit(uncompiled)?;
    values.insert("uncompiled_ideal", observable.expectation(&ideal)?);
    let ideal = Statevector::from_circuit(compiled)?;
    values.insert("compiled_ideal", observable.expectation(&ideal)?);

    if uncompiled.num_qubits() <= MAX_DENSITY_MATRIX_QUBITS
        && compiled.num_qubits() <= MAX_DENSITY_MATRIX_QUBITS
    {
        let noisy = DensityMatrix::from_circuit(uncompiled, &spec.noise)?;
        values.insert("uncompiled_noisy", observable.expectation(&noisy)?);
        let noisy = DensityMatrix::from_circuit(compiled, &spec.noise)?;
        values.insert("compiled_noisy", observable.expectation(&noisy)?);
    } else {
        debug!(
            "Skipping noisy simulation: {} qubits exceeds density-matrix limit",
            compiled.num_qubits()
        );
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::FailureKind;
    use crate::unoptimize::Strategy;
    use qcbench_sim::NoiseModel;
    use std::path::Path;

    fn write_qasm(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const GHZ3: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[3];\nh q[0];\ncx q[0],q[1];\ncx q[1],q[2];\n";

    fn descriptor(path: &Path, compiler: &str) -> TaskDescriptor {
        TaskDescriptor {
            index: 0,
            suite_id: "unit".into(),
            compiler: CompilerSpec::new(compiler),
            benchmark: BenchmarkSpec {
                id: "ghz".into(),
                description: String::new(),
                qasm_file: path.to_path_buf(),
                resolved_qasm_file: Some(path.to_path_buf()),
                qubit_count: Some(3),
                simulate: None,
            },
            target_device_id: None,
            unoptimization: None,
            output_metrics: vec!["gate_count_ratio".into()],
        }
    }

    #[test]
    fn test_successful_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();

        let result = run_task(&descriptor(&path, "peephole"), &registry);
        assert_eq!(result.status, TaskStatus::Succeeded, "{:?}", result.error);
        assert!(result.compilation.success);
        assert_eq!(result.compilation.raw_gate_count, 3);
        assert!(result.compilation.gate_count > 0);
        assert!(result.compilation.output_metrics.contains_key("gate_count_ratio"));
        assert_eq!(result.compiler_version, env!("CARGO_PKG_VERSION"));
        assert!(result.simulation.is_none());
    }

    #[test]
    fn test_missing_circuit_is_load_failure() {
        let registry = Registry::builtin().unwrap();
        let task = descriptor(Path::new("/nonexistent/ghz.qasm"), "translate");

        let result = run_task(&task, &registry);
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error.unwrap().kind, FailureKind::CircuitLoad);
        assert!(!result.compilation.success);
    }

    #[test]
    fn test_observable_simulation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();
        let mut task = descriptor(&path, "translate");
        task.benchmark.simulate = Some(SimulationSpec {
            measurement: "ghz_state_projector".into(),
            noise: NoiseModel::default(),
        });

        let result = run_task(&task, &registry);
        let sim = result.simulation.expect("simulation metrics");
        assert!((sim.get("uncompiled_ideal").unwrap() - 1.0).abs() < 1e-9);
        assert!((sim.get("compiled_ideal").unwrap() - 1.0).abs() < 1e-9);
        assert!(sim.get("compiled_noisy").unwrap() < 1.0);
        assert!(sim.get("uncompiled_noisy").unwrap() > 0.9);
    }

    #[test]
    fn test_metric_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();
        let mut task = descriptor(&path, "translate");
        task.benchmark.simulate = Some(SimulationSpec {
            measurement: "depth".into(),
            noise: NoiseModel::default(),
        });

        let result = run_task(&task, &registry);
        let sim = result.simulation.unwrap();
        assert_eq!(sim.iter().count(), 1);
        assert!(sim.get("depth").unwrap() >= 3.0);
    }

    #[test]
    fn test_simulation_failure_keeps_compilation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();
        let mut task = descriptor(&path, "translate");
        // Three qubits is not a square lattice.
        task.benchmark.simulate = Some(SimulationSpec {
            measurement: crate::observables::HEISENBERG_ID.into(),
            noise: NoiseModel::default(),
        });

        let result = run_task(&task, &registry);
        assert_eq!(result.status, TaskStatus::Succeeded);
        assert!(result.error.is_none());
        assert!(result.compilation.success);
        assert!(result.compilation.gate_count > 0);
        assert!(result.simulation.is_none());
        let message = result.simulation_error.unwrap();
        assert!(message.contains("not defined on 3 qubits"), "{message}");
        assert!(message.contains("perfect square"), "{message}");
    }

    #[test]
    fn test_unoptimized_task_reports_growth() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();
        let mut task = descriptor(&path, "translate");
        task.unoptimization = Some(UnoptimizationConfig {
            enabled: true,
            iterations: 2,
            strategy: Strategy::Random,
            seed: Some(11),
            ..UnoptimizationConfig::default()
        });

        let result = run_task(&task, &registry);
        assert!(result.succeeded(), "{:?}", result.error);
        let report = result.unoptimization.unwrap();
        assert_eq!(report.gate_count_before, 3);
        assert!(result.compilation.raw_gate_count > 3);
    }

    #[test]
    fn test_target_device_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();
        let mut task = descriptor(&path, "peephole");
        task.target_device_id = Some("linear_20".into());

        let result = run_task(&task, &registry);
        assert!(result.succeeded(), "{:?}", result.error);
        assert_eq!(result.target_device_id.as_deref(), Some("linear_20"));
    }

    #[test]
    fn test_unknown_compiler_is_compilation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_qasm(dir.path(), "ghz.qasm", GHZ3);
        let registry = Registry::builtin().unwrap();

        let result = run_task(&descriptor(&path, "nope"), &registry);
        assert_eq!(result.error.unwrap().kind, FailureKind::Compilation);
    }
}
