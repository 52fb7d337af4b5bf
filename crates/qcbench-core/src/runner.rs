//! Task expansion and parallel dispatch.
//!
//! A suite expands into one [`TaskDescriptor`] per (compiler, benchmark,
//! target device) triple. Descriptors are handed to a [`TaskDispatcher`]
//! with at most `parallelism` in flight; results come back in completion
//! order and are put into declaration order by
//! [`SuiteResults::collect`](crate::results::SuiteResults::collect).
//!
//! Two dispatchers ship with the crate:
//!
//! - [`InProcessDispatcher`] runs tasks on the tokio blocking pool and turns
//!   panics into failed results.
//! - [`SubprocessDispatcher`] runs each task in a fresh worker process that
//!   speaks JSON on stdin and stdout.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::error::{ConfigError, ConfigResult, QcbenchResult, TaskError};
use crate::metadata::RunMetadata;
use crate::registry::Registry;
use crate::results::{BenchmarkResult, SuiteResults};
use crate::suite::Suite;
use crate::task::{TaskDescriptor, run_task};

/// Where task bodies run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Isolation {
    /// One worker process per task.
    #[default]
    Process,
    /// Blocking threads inside the runner process.
    InProcess,
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isolation::Process => write!(f, "process"),
            Isolation::InProcess => write!(f, "in-process"),
        }
    }
}

impl FromStr for Isolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(Isolation::Process),
            "in-process" | "in_process" => Ok(Isolation::InProcess),
            other => Err(format!(
                "unknown isolation '{other}' (expected process or in-process)"
            )),
        }
    }
}

/// Restrict a run to a single compiler, benchmark or target device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub only_compiler: Option<String>,
    pub only_benchmark: Option<String>,
    pub only_target_device: Option<String>,
}

/// Run settings threaded through the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum tasks in flight.
    pub parallelism: usize,
    /// Where task bodies run.
    pub isolation: Isolation,
    /// Task filters.
    pub filters: TaskFilters,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            isolation: Isolation::default(),
            filters: TaskFilters::default(),
        }
    }
}

impl RunOptions {
    /// Reject settings the runner cannot honour.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.parallelism == 0 {
            return Err(ConfigError::RunOptions(
                "parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Logical CPUs available to this process.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn check_filter<'a>(
    field: &'static str,
    filter: Option<&str>,
    mut ids: impl Iterator<Item = &'a str>,
) -> ConfigResult<()> {
    match filter {
        Some(id) if !ids.any(|candidate| candidate == id) => Err(ConfigError::UnknownFilter {
            field,
            id: id.to_string(),
        }),
        _ => Ok(()),
    }
}

fn keep(filter: Option<&str>, id: &str) -> bool {
    filter.is_none_or(|wanted| wanted == id)
}

/// Expand `suite` into task descriptors in declaration order, compiler-major.
///
/// Without target devices every (compiler, benchmark) pair yields one task
/// with no device.
pub fn expand_tasks(suite: &Suite, filters: &TaskFilters) -> ConfigResult<Vec<TaskDescriptor>> {
    let only_compiler = filters.only_compiler.as_deref();
    let only_benchmark = filters.only_benchmark.as_deref();
    let only_device = filters.only_target_device.as_deref();

    check_filter("compiler", only_compiler, suite.compilers.iter().map(|c| c.id.as_str()))?;
    check_filter("benchmark", only_benchmark, suite.benchmarks.iter().map(|b| b.id.as_str()))?;
    check_filter(
        "target-device",
        only_device,
        suite.target_devices.iter().map(|d| d.id.as_str()),
    )?;

    let devices: Vec<Option<&str>> = if suite.target_devices.is_empty() {
        vec![None]
    } else {
        suite
            .target_devices
            .iter()
            .map(|d| d.id.as_str())
            .filter(|id| keep(only_device, id))
            .map(Some)
            .collect()
    };
    let unoptimization = suite.active_unoptimization().cloned();

    let mut tasks = Vec::new();
    for compiler in suite.compilers.iter().filter(|c| keep(only_compiler, &c.id)) {
        for benchmark in suite.benchmarks.iter().filter(|b| keep(only_benchmark, &b.id)) {
            for device in &devices {
                tasks.push(TaskDescriptor {
                    index: tasks.len(),
                    suite_id: suite.id.clone(),
                    compiler: compiler.clone(),
                    benchmark: benchmark.clone(),
                    target_device_id: device.map(str::to_string),
                    unoptimization: unoptimization.clone(),
                    output_metrics: suite.output_metrics.clone(),
                });
            }
        }
    }
    Ok(tasks)
}

/// Runs one task somewhere and always returns its result.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Run `task` to completion. Infrastructure failures become failed
    /// results of kind `Worker`.
    async fn dispatch(&self, task: TaskDescriptor) -> BenchmarkResult;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Runs tasks on the tokio blocking pool of the current process.
#[derive(Debug, Clone)]
pub struct InProcessDispatcher {
    registry: Arc<Registry>,
}

impl InProcessDispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl TaskDispatcher for InProcessDispatcher {
    async fn dispatch(&self, task: TaskDescriptor) -> BenchmarkResult {
        let registry = Arc::clone(&self.registry);
        let descriptor = task.clone();
        let joined = tokio::task::spawn_blocking(move || {
            catch_unwind(AssertUnwindSafe(|| run_task(&descriptor, &registry)))
        })
        .await;

        match joined {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => BenchmarkResult::failed(
                &task,
                &TaskError::Worker(format!("task panicked: {}", panic_message(panic.as_ref()))),
            ),
            Err(err) => BenchmarkResult::failed(&task, &TaskError::Worker(err.to_string())),
        }
    }
}

/// Runs each task in a child process.
///
/// The child receives the descriptor as JSON on stdin and must print one
/// [`BenchmarkResult`] as JSON on stdout. Its stderr is captured and the
/// last line is quoted when it exits unsuccessfully.
#[derive(Debug, Clone)]
pub struct SubprocessDispatcher {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessDispatcher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-execute the running binary with the `worker` subcommand.
    pub fn current_exe(extra_args: impl IntoIterator<Item = String>) -> std::io::Result<Self> {
        let mut args = vec!["worker".to_string()];
        args.extend(extra_args);
        Ok(Self::new(std::env::current_exe()?, args))
    }

    async fn run_child(&self, task: &TaskDescriptor) -> Result<BenchmarkResult, String> {
        let input =
            serde_json::to_vec(task).map_err(|e| format!("failed to encode task: {e}"))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| format!("failed to send task to worker: {e}"))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("failed to wait for worker: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(line) => format!("worker exited with {}: {}", output.status, line.trim()),
                None => format!("worker exited with {}", output.status),
            });
        }

        let result: BenchmarkResult = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("garbled worker output: {e}"))?;
        if result.index != task.index {
            return Err(format!(
                "worker answered task {} instead of {}",
                result.index, task.index
            ));
        }
        Ok(result)
    }
}

#[async_trait]
impl TaskDispatcher for SubprocessDispatcher {
    async fn dispatch(&self, task: TaskDescriptor) -> BenchmarkResult {
        match self.run_child(&task).await {
            Ok(result) => result,
            Err(message) => BenchmarkResult::failed(&task, &TaskError::Worker(message)),
        }
    }
}

/// Per-task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Receives task state transitions. Called from runner tasks, possibly
/// concurrently.
pub trait ProgressObserver: Send + Sync {
    fn on_transition(&self, task: &TaskDescriptor, state: TaskState);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_transition(&self, _task: &TaskDescriptor, _state: TaskState) {}
}

/// Dispatch `tasks` with at most `parallelism` in flight.
///
/// Returns one result per task in completion order.
pub async fn run_tasks(
    tasks: &[TaskDescriptor],
    dispatcher: Arc<dyn TaskDispatcher>,
    observer: Arc<dyn ProgressObserver>,
    parallelism: usize,
) -> Vec<BenchmarkResult> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut set = JoinSet::new();

    for task in tasks {
        observer.on_transition(task, TaskState::Pending);
    }
    for task in tasks.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let dispatcher = Arc::clone(&dispatcher);
        let observer = Arc::clone(&observer);
        set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    return BenchmarkResult::failed(&task, &TaskError::Worker(err.to_string()));
                }
            };
            observer.on_transition(&task, TaskState::Running);
            debug!(index = task.index, "Dispatching task");
            let result = dispatcher.dispatch(task.clone()).await;
            let state = if result.succeeded() {
                TaskState::Succeeded
            } else {
                TaskState::Failed
            };
            observer.on_transition(&task, state);
            result
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    let mut reported = BTreeSet::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                reported.insert(result.index);
                results.push(result);
            }
            Err(err) => debug!("Runner task aborted: {err}"),
        }
    }

    // A runner task that died without reporting still owes a result.
    for task in tasks.iter().filter(|t| !reported.contains(&t.index)) {
        let result = BenchmarkResult::failed(
            task,
            &TaskError::Worker("task aborted before reporting".into()),
        );
        observer.on_transition(task, TaskState::Failed);
        results.push(result);
    }
    results
}

/// Expanded tasks and their results in completion order.
#[derive(Debug)]
pub struct RunOutcome {
    pub tasks: Vec<TaskDescriptor>,
    pub results: Vec<BenchmarkResult>,
}

/// Runs a suite with one dispatcher and observer.
pub struct Runner {
    options: RunOptions,
    dispatcher: Arc<dyn TaskDispatcher>,
    observer: Arc<dyn ProgressObserver>,
}

impl Runner {
    pub fn new(options: RunOptions, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            options,
            dispatcher,
            observer: Arc::new(NoProgress),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Tasks the suite expands to under this runner's filters.
    pub fn expand(&self, suite: &Suite) -> ConfigResult<Vec<TaskDescriptor>> {
        expand_tasks(suite, &self.options.filters)
    }

    /// Expand and execute `suite`.
    #[instrument(skip_all, fields(suite = %suite.id))]
    pub async fn run(&self, suite: &Suite) -> ConfigResult<RunOutcome> {
        self.options.validate()?;
        let tasks = self.expand(suite)?;
        info!(
            "Running {} tasks with parallelism {} ({} isolation)",
            tasks.len(),
            self.options.parallelism,
            self.options.isolation
        );
        let results = run_tasks(
            &tasks,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.observer),
            self.options.parallelism,
        )
        .await;
        Ok(RunOutcome { tasks, results })
    }

    /// Run `suite` to completion and collect its result document.
    ///
    /// `metadata` is stamped with the run end once the last task reports.
    pub async fn execute(&self, suite: Suite, mut metadata: RunMetadata) -> QcbenchResult<SuiteResults> {
        let outcome = self.run(&suite).await?;
        metadata.finish();
        let expected = outcome.tasks.len();
        Ok(SuiteResults::collect(suite, metadata, expected, outcome.results)?)
    }
}
