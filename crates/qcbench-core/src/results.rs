//! Per-task results and the suite-level result document.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ResultsError, ResultsResult, TaskError};
use crate::metadata::RunMetadata;
use crate::suite::Suite;
use crate::task::TaskDescriptor;
use crate::unoptimize::UnoptimizeReport;

/// Stage a task failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The circuit file could not be loaded.
    CircuitLoad,
    /// Unoptimization failed.
    Unoptimization,
    /// Compilation failed or produced an invalid circuit.
    Compilation,
    /// Simulation failed.
    Simulation,
    /// The worker crashed, panicked or returned garbage.
    Worker,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::CircuitLoad => "CircuitLoadError",
            FailureKind::Unoptimization => "UnoptimizationError",
            FailureKind::Compilation => "CompilationError",
            FailureKind::Simulation => "SimulationError",
            FailureKind::Worker => "WorkerError",
        };
        f.write_str(name)
    }
}

/// A recorded task failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Failing stage.
    pub kind: FailureKind,
    /// Error message.
    pub message: String,
}

impl From<&TaskError> for TaskFailure {
    fn from(err: &TaskError) -> Self {
        Self {
            kind: err.kind(),
            message: err.detail(),
        }
    }
}

/// Final task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Compilation succeeded (simulation may still have failed).
    Succeeded,
    /// A stage up to and including compilation failed.
    Failed,
}

/// Compilation timing and output quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationMetrics {
    /// Whether the compiler produced a valid circuit.
    pub success: bool,
    /// Wall time of the `compile` call.
    pub wall_time_seconds: f64,
    /// Gates in the compiled circuit.
    pub gate_count: usize,
    /// Multi-qubit gates in the compiled circuit.
    pub two_qubit_gate_count: usize,
    /// Depth of the compiled circuit.
    pub depth: usize,
    /// Gates in the circuit handed to the compiler.
    pub raw_gate_count: usize,
    /// Multi-qubit gates in the circuit handed to the compiler.
    pub raw_two_qubit_gate_count: usize,
    /// Depth of the circuit handed to the compiler.
    pub raw_depth: usize,
    /// The compiler's own notes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compiler_metrics: BTreeMap<String, f64>,
    /// Suite-level output metrics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_metrics: BTreeMap<String, f64>,
    /// Failure message when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simulated measurement values keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationMetrics(pub BTreeMap<String, f64>);

impl SimulationMetrics {
    /// A value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Record a value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Task bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// When the task body started.
    pub started_at: DateTime<Utc>,
    /// When the task body finished.
    pub finished_at: DateTime<Utc>,
    /// OS process that ran the task.
    pub worker_pid: u32,
}

impl TaskMetadata {
    fn now() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            worker_pid: std::process::id(),
        }
    }
}

/// Outcome of one (compiler, benchmark, target device) task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Position in the expanded task list.
    pub index: usize,
    /// Compiler registry id.
    pub compiler_id: String,
    /// Compiler display name.
    pub compiler_display_name: String,
    /// Version reported by the compiler.
    pub compiler_version: String,
    /// Benchmark id.
    pub benchmark_id: String,
    /// Target device, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<String>,
    /// Final state.
    pub status: TaskStatus,
    /// Failure that stopped the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
    /// Compilation metrics.
    pub compilation: CompilationMetrics,
    /// Simulation metrics, when simulated successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationMetrics>,
    /// Simulation failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_error: Option<String>,
    /// Unoptimization summary, when the stage ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unoptimization: Option<UnoptimizeReport>,
    /// Task bookkeeping.
    pub metadata: TaskMetadata,
}

impl BenchmarkResult {
    /// A result for `task` that has not progressed past setup.
    pub fn pending(task: &TaskDescriptor) -> Self {
        Self {
            index: task.index,
            compiler_id: task.compiler.id.clone(),
            compiler_display_name: task.compiler.display_name().to_string(),
            compiler_version: task.compiler.version.clone().unwrap_or_default(),
            benchmark_id: task.benchmark.id.clone(),
            target_device_id: task.target_device_id.clone(),
            status: TaskStatus::Succeeded,
            error: None,
            compilation: CompilationMetrics::default(),
            simulation: None,
            simulation_error: None,
            unoptimization: None,
            metadata: TaskMetadata::now(),
        }
    }

    /// A failed result for `task`.
    pub fn failed(task: &TaskDescriptor, err: &TaskError) -> Self {
        let mut result = Self::pending(task);
        result.fail(err);
        result
    }

    /// Mark this result failed with `err`.
    pub fn fail(&mut self, err: &TaskError) {
        self.status = TaskStatus::Failed;
        self.compilation.success = false;
        if self.compilation.error.is_none() {
            self.compilation.error = Some(err.to_string());
        }
        self.error = Some(TaskFailure::from(err));
        self.metadata.finished_at = Utc::now();
    }

    /// Whether the task succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

/// The result document of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// The suite as loaded (after overrides).
    pub suite: Suite,
    /// Run identity and environment.
    pub metadata: RunMetadata,
    /// One result per task, in declaration order.
    pub results: Vec<BenchmarkResult>,
}

impl SuiteResults {
    /// Put `results` in task order and check each of `expected` tasks
    /// reported exactly once.
    pub fn collect(
        suite: Suite,
        metadata: RunMetadata,
        expected: usize,
        results: impl IntoIterator<Item = BenchmarkResult>,
    ) -> ResultsResult<Self> {
        let mut slots: Vec<Option<BenchmarkResult>> = vec![None; expected];
        for result in results {
            let index = result.index;
            let slot = slots.get_mut(index).ok_or(ResultsError::UnknownTask(index))?;
            if slot.is_some() {
                return Err(ResultsError::DuplicateTask(index));
            }
            *slot = Some(result);
        }
        let results = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or(ResultsError::MissingTask(i)))
            .collect::<ResultsResult<Vec<_>>>()?;
        Ok(Self {
            suite,
            metadata,
            results,
        })
    }

    /// Number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::sample_metadata;
    use crate::suite::{BenchmarkSpec, CompilerSpec};

    fn suite() -> Suite {
        Suite {
            spec_path: "suite.toml".into(),
            spec_version: "1".into(),
            suite_version: "1".into(),
            id: "s".into(),
            description: String::new(),
            compilers: vec![],
            benchmarks: vec![],
            target_devices: vec![],
            output_metrics: vec![],
            unoptimization: None,
        }
    }

    fn task(index: usize) -> TaskDescriptor {
        TaskDescriptor {
            index,
            suite_id: "s".into(),
            compiler: CompilerSpec::new("translate"),
            benchmark: BenchmarkSpec {
                id: format!("b{index}"),
                description: String::new(),
                qasm_file: "b.qasm".into(),
                resolved_qasm_file: None,
                qubit_count: None,
                simulate: None,
            },
            target_device_id: None,
            unoptimization: None,
            output_metrics: vec![],
        }
    }

    #[test]
    fn test_collect_reorders() {
        let results = vec![
            BenchmarkResult::pending(&task(2)),
            BenchmarkResult::pending(&task(0)),
            BenchmarkResult::pending(&task(1)),
        ];
        let collected = SuiteResults::collect(suite(), sample_metadata(), 3, results).unwrap();
        let ids: Vec<&str> = collected.results.iter().map(|r| r.benchmark_id.as_str()).collect();
        assert_eq!(ids, vec!["b0", "b1", "b2"]);
    }

    #[test]
    fn test_collect_detects_missing_and_duplicates() {
        let missing = SuiteResults::collect(
            suite(),
            sample_metadata(),
            2,
            vec![BenchmarkResult::pending(&task(0))],
        );
        assert!(matches!(missing, Err(ResultsError::MissingTask(1))));

        let duplicate = SuiteResults::collect(
            suite(),
            sample_metadata(),
            2,
            vec![BenchmarkResult::pending(&task(0)), BenchmarkResult::pending(&task(0))],
        );
        assert!(matches!(duplicate, Err(ResultsError::DuplicateTask(0))));

        let unknown = SuiteResults::collect(
            suite(),
            sample_metadata(),
            1,
            vec![BenchmarkResult::pending(&task(5))],
        );
        assert!(matches!(unknown, Err(ResultsError::UnknownTask(5))));
    }

    #[test]
    fn test_failed_result_records_stage() {
        let err = TaskError::Worker("worker exited with signal 9".into());
        let result = BenchmarkResult::failed(&task(0), &err);
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(!result.compilation.success);
        let failure = result.error.unwrap();
        assert_eq!(failure.kind, FailureKind::Worker);
        assert_eq!(failure.kind.to_string(), "WorkerError");
    }

    #[test]
    fn test_result_json_shape() {
        let mut result = BenchmarkResult::pending(&task(0));
        result.compilation.success = true;
        let mut sim = SimulationMetrics::default();
        sim.insert("compiled_ideal", 1.0);
        result.simulation = Some(sim);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["simulation"]["compiled_ideal"], 1.0);
        assert!(json.get("error").is_none());

        let back: BenchmarkResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
