//! Error types for the benchmark harness.
//!
//! Fatal errors ([`RegistryError`], [`ConfigError`], [`ResultsError`]) stop a
//! run before any task is dispatched or before anything is written. Task
//! errors ([`TaskError`]) are caught by the runner and recorded in the
//! task's [`BenchmarkResult`](crate::results::BenchmarkResult).

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ProviderKind;
use crate::results::FailureKind;

/// Registry lookup and registration failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// Nothing is registered under this key.
    #[error("No {kind} registered with id '{id}'")]
    NotRegistered { kind: ProviderKind, id: String },

    /// The key is already taken.
    #[error("Duplicate {kind} registration: '{id}'")]
    Duplicate { kind: ProviderKind, id: String },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Invalid suite specification or run configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The suite file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error.
    #[error("Invalid suite file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// YAML syntax or schema error.
    #[error("Invalid suite file {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The suite file extension is not one of `.toml`, `.yaml`, `.yml`.
    #[error("Unsupported suite file format: {} (expected .toml, .yaml or .yml)", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The suite declares a format version this build does not read.
    #[error("Unsupported spec_version '{0}' (expected \"1\")")]
    UnsupportedSpecVersion(String),

    /// Two entries of one list share an id.
    #[error("Duplicate {field} id: {id}")]
    DuplicateId { field: &'static str, id: String },

    /// A referenced provider is not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A simulation measurement names neither an observable nor an output metric.
    #[error("Unknown measurement id '{id}' for benchmark '{benchmark}'")]
    UnknownMeasurement { benchmark: String, id: String },

    /// A benchmark circuit path does not point to a file.
    #[error("qasm_file for benchmark '{benchmark}' does not point to a valid file: {}", path.display())]
    MissingCircuit { benchmark: String, path: PathBuf },

    /// A benchmark circuit does not parse.
    #[error("Benchmark '{benchmark}' circuit does not parse: {source}")]
    CircuitParse {
        benchmark: String,
        #[source]
        source: qcbench_qasm::ParseError,
    },

    /// The declared qubit count disagrees with the parsed circuit.
    #[error("Benchmark '{benchmark}' declares {declared} qubits but its circuit has {actual}")]
    QubitCountMismatch {
        benchmark: String,
        declared: usize,
        actual: usize,
    },

    /// A simulation noise model is out of range.
    #[error("Invalid noise model for benchmark '{benchmark}': {message}")]
    InvalidNoise { benchmark: String, message: String },

    /// The declared compiler version disagrees with the provider.
    #[error("Compiler '{compiler}' is version {actual}, suite expects {expected}")]
    CompilerVersion {
        compiler: String,
        expected: String,
        actual: String,
    },

    /// The provider rejected its `compiler_args`.
    #[error("Invalid compiler_args for '{compiler}': {message}")]
    CompilerArgs { compiler: String, message: String },

    /// An unoptimization setting is out of range or inconsistent.
    #[error("Invalid unoptimization config: {0}")]
    Unoptimization(String),

    /// An `only_*` filter names an id the suite does not declare.
    #[error("--only-{field} '{id}' does not match any {field} in the suite")]
    UnknownFilter { field: &'static str, id: String },

    /// Invalid run options.
    #[error("Invalid run options: {0}")]
    RunOptions(String),
}

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A compiler could not produce a valid circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompilationError {
    /// The pass pipeline failed.
    #[error(transparent)]
    Compile(#[from] qcbench_compile::CompileError),

    /// The provider rejected its arguments.
    #[error("Invalid compiler_args: {0}")]
    InvalidArgs(String),

    /// The compiled circuit uses gates outside the allowed set.
    #[error("Compiled circuit uses gates outside the allowed set: {}", gates.join(", "))]
    GateSet { gates: Vec<String> },

    /// The compiled circuit changed width.
    #[error("Compiled circuit has {actual} qubits, expected {expected}")]
    WidthChanged { expected: usize, actual: usize },

    /// Provider-specific failure.
    #[error("{0}")]
    Provider(String),
}

/// The unoptimizer could not grow a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnoptimizeError {
    /// Configuration rejected before running.
    #[error("Invalid unoptimization config: {0}")]
    InvalidConfig(String),

    /// Synthesis or re-compilation failed.
    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] qcbench_compile::CompileError),

    /// Building the grown circuit failed.
    #[error(transparent)]
    Ir(#[from] qcbench_ir::IrError),

    /// A dense block could not be built.
    #[error("Circuit contains an instruction the unoptimizer cannot handle: {0}")]
    Unsupported(String),

    /// The grown circuit no longer matches the input's register layout.
    #[error("Unoptimized circuit changed the register layout")]
    LayoutChanged,
}

/// Result type for unoptimization.
pub type UnoptimizeResult<T> = Result<T, UnoptimizeError>;

/// A task-scoped failure. Recorded in the result, never fatal to the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The benchmark circuit could not be loaded.
    #[error("Circuit load failed: {0}")]
    CircuitLoad(#[from] qcbench_qasm::ParseError),

    /// The unoptimization stage failed.
    #[error(transparent)]
    Unoptimization(#[from] UnoptimizeError),

    /// Compilation failed.
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    /// A provider lookup failed inside a worker.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Simulation or measurement failed.
    #[error("Simulation failed: {0}")]
    Simulation(String),

    /// The task body panicked or its worker process misbehaved.
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl TaskError {
    /// The failure kind recorded in results.
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::CircuitLoad(_) => FailureKind::CircuitLoad,
            TaskError::Unoptimization(_) => FailureKind::Unoptimization,
            TaskError::Compilation(_) | TaskError::Registry(_) => FailureKind::Compilation,
            TaskError::Simulation(_) => FailureKind::Simulation,
            TaskError::Worker(_) => FailureKind::Worker,
        }
    }

    /// The message without the prefix that repeats [`TaskError::kind`].
    pub fn detail(&self) -> String {
        match self {
            TaskError::CircuitLoad(e) => e.to_string(),
            TaskError::Simulation(msg) | TaskError::Worker(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<qcbench_sim::SimError> for TaskError {
    fn from(e: qcbench_sim::SimError) -> Self {
        TaskError::Simulation(e.to_string())
    }
}

/// Result type for task stages.
pub type TaskResult<T> = Result<T, TaskError>;

/// Aggregation and artifact failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsError {
    /// Filesystem error while writing an artifact.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusing to overwrite an existing artifact.
    #[error("Result artifact already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Serialization failed.
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A task index produced no result.
    #[error("No result for task {0}")]
    MissingTask(usize),

    /// A task index produced more than one result.
    #[error("Task {0} reported more than once")]
    DuplicateTask(usize),

    /// A result carries an index outside the expanded task list.
    #[error("Result for unknown task index {0}")]
    UnknownTask(usize),
}

/// Result type for aggregation and persistence.
pub type ResultsResult<T> = Result<T, ResultsError>;

/// Top-level error for a benchmark run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QcbenchError {
    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unoptimization failure outside the runner.
    #[error(transparent)]
    Unoptimize(#[from] UnoptimizeError),

    /// Aggregation or persistence failure.
    #[error(transparent)]
    Results(#[from] ResultsError),
}

/// Result type for whole-run operations.
pub type QcbenchResult<T> = Result<T, QcbenchError>;
