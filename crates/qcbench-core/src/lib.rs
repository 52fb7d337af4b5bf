//! `qcbench-core`: benchmark harness for quantum circuit compilers.
//!
//! A [`Suite`] names compilers, benchmark circuits, target devices and
//! metrics by registry id. The [`Runner`] expands it into one task per
//! (compiler, benchmark, device) triple, runs the tasks in parallel and the
//! results are collected into a [`SuiteResults`] document in declaration
//! order, then written once with [`write_artifacts`].
//!
//! ```text
//! Suite::load ─► Runner::run ─► TaskDispatcher ─► run_task ─► SuiteResults::collect ─► write_artifacts
//!                  │                               │
//!                  └─ expand_tasks                 ├─ parse_file
//!                                                  ├─ unoptimize (optional)
//!                                                  ├─ Compiler::compile + gate-set check
//!                                                  └─ simulate (optional)
//! ```
//!
//! # Extension points
//!
//! Compilers, observables, output metrics and target devices are looked up
//! in a [`Registry`] built once at startup:
//!
//! ```rust
//! use qcbench_core::{ProviderKind, RegistryBuilder};
//!
//! let mut builder = RegistryBuilder::with_builtins().unwrap();
//! builder
//!     .register_output_metric("cx_count", |compiled: &qcbench_ir::Circuit, _: &qcbench_ir::Circuit| {
//!         compiled.count_ops().get("cx").copied().unwrap_or(0) as f64
//!     })
//!     .unwrap();
//! let registry = builder.freeze();
//! assert!(registry.contains(ProviderKind::OutputMetric, "cx_count"));
//! ```
//!
//! # Unoptimization
//!
//! [`unoptimize`] grows a circuit by inserting blocks that multiply to the
//! identity and resynthesizing them, so compilers have redundancy to remove.
//! The output is equivalent to the input.

pub mod compilers;
pub mod devices;
pub mod error;
pub mod export;
pub mod gateset;
pub mod metadata;
pub mod metrics;
pub mod observables;
pub mod provider;
pub mod registry;
pub mod results;
pub mod runner;
pub mod suite;
pub mod task;
pub mod unoptimize;
pub mod worker;

pub use devices::TargetDevice;
pub use error::{
    CompilationError, ConfigError, ConfigResult, QcbenchError, QcbenchResult, RegistryError,
    RegistryResult, ResultsError, ResultsResult, TaskError, TaskResult, UnoptimizeError,
    UnoptimizeResult,
};
pub use export::{Artifacts, write_artifacts};
pub use metadata::{RunIdentity, RunMetadata, RunnerSpecs};
pub use provider::{CompileOutput, Compiler, CompilerArgs, Observable, OutputMetric};
pub use registry::{ProviderKind, Registry, RegistryBuilder};
pub use results::{
    BenchmarkResult, CompilationMetrics, FailureKind, SimulationMetrics, SuiteResults, TaskFailure,
    TaskStatus,
};
pub use runner::{
    InProcessDispatcher, Isolation, ProgressObserver, RunOptions, RunOutcome, Runner,
    SubprocessDispatcher, TaskDispatcher, TaskFilters, TaskState, expand_tasks, run_tasks,
};
pub use suite::{Suite, UnoptimizationOverrides};
pub use task::{TaskDescriptor, run_task};
pub use unoptimize::{
    DecompositionMethod, Strategy, UnoptimizationConfig, UnoptimizeReport, unoptimize,
};
pub use worker::run_worker;
