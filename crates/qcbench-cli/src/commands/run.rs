//! Run command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qcbench_core::metadata::parse_timestamp;
use qcbench_core::runner::default_parallelism;
use qcbench_core::unoptimize::{DecompositionMethod, Strategy};
use qcbench_core::{
    InProcessDispatcher, Isolation, ProgressObserver, Registry, RunIdentity, RunMetadata,
    RunOptions, Runner, SubprocessDispatcher, Suite, TaskDescriptor,
    TaskDispatcher, TaskFilters, TaskState, UnoptimizationOverrides, write_artifacts,
};

/// Options of `qcbench run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite file (.toml, .yaml or .yml)
    pub suite: PathBuf,

    /// Run id (a random UUID when omitted)
    #[arg(long)]
    pub uid: Option<String>,

    /// Run timestamp, RFC 3339 (now when omitted)
    #[arg(long)]
    pub uid_timestamp: Option<String>,

    /// Directory result artifacts are written under
    #[arg(short, long, env = "QCBENCH_OUT", default_value = ".local_results")]
    pub out: PathBuf,

    /// Machine label used in the artifact path (host name when omitted)
    #[arg(long, env = "QCBENCH_RUNNER_NAME")]
    pub runner_name: Option<String>,

    /// Maximum tasks in flight (available parallelism when omitted)
    #[arg(short = 'j', long = "parallel", env = "QCBENCH_PARALLEL")]
    pub parallel: Option<usize>,

    /// Where task bodies run (process, in-process)
    #[arg(long, default_value_t = Isolation::Process)]
    pub isolation: Isolation,

    /// Only run this compiler
    #[arg(long)]
    pub only_compiler: Option<String>,

    /// Only run this benchmark
    #[arg(long)]
    pub only_benchmark: Option<String>,

    /// Only run this target device
    #[arg(long)]
    pub only_target_device: Option<String>,

    /// Revision of the compiler sources under test
    #[arg(long)]
    pub ucc_hash: Option<String>,

    /// Commit time of that revision
    #[arg(long)]
    pub ucc_timestamp: Option<String>,

    /// Enable unoptimization
    #[arg(long)]
    pub unopt: bool,

    /// Unoptimization iterations
    #[arg(long)]
    pub unopt_iterations: Option<u32>,

    /// Insertion strategy (concatenated, random)
    #[arg(long)]
    pub unopt_strategy: Option<Strategy>,

    /// Block decomposition (default, kak, basis)
    #[arg(long)]
    pub unopt_decomposition: Option<DecompositionMethod>,

    /// Optimization level of the final re-synthesis (0-3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub unopt_opt_level: Option<u8>,

    /// Unoptimization seed
    #[arg(long)]
    pub unopt_seed: Option<u64>,

    /// Skip the final re-synthesis
    #[arg(long)]
    pub unopt_skip_synth: bool,
}

impl RunArgs {
    pub fn unoptimization_overrides(&self) -> UnoptimizationOverrides {
        UnoptimizationOverrides {
            enable: self.unopt,
            iterations: self.unopt_iterations,
            strategy: self.unopt_strategy,
            decomposition_method: self.unopt_decomposition,
            optimization_level: self.unopt_opt_level,
            seed: self.unopt_seed,
            skip_synthesize: self.unopt_skip_synth,
        }
    }

    pub fn task_filters(&self) -> TaskFilters {
        TaskFilters {
            only_compiler: self.only_compiler.clone(),
            only_benchmark: self.only_benchmark.clone(),
            only_target_device: self.only_target_device.clone(),
        }
    }

    fn identity(&self) -> Result<RunIdentity> {
        let uid_timestamp = self
            .uid_timestamp
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("Invalid --uid-timestamp (expected RFC 3339)")?;
        Ok(RunIdentity {
            uid: self.uid.clone(),
            uid_timestamp,
            runner_name: self.runner_name.clone(),
            runner_args: std::env::args().collect(),
            ucc_hash: self.ucc_hash.clone(),
            ucc_timestamp: self.ucc_timestamp.clone(),
        })
    }
}

/// Progress bar fed by runner state transitions.
struct ProgressReporter {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl ProgressReporter {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self {
            bar,
            failed: AtomicUsize::new(0),
        }
    }

    fn label(task: &TaskDescriptor) -> String {
        match &task.target_device_id {
            Some(device) => format!("{} / {} @ {device}", task.compiler.id, task.benchmark.id),
            None => format!("{} / {}", task.compiler.id, task.benchmark.id),
        }
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_transition(&self, task: &TaskDescriptor, state: TaskState) {
        match state {
            TaskState::Pending => {}
            TaskState::Running => self.bar.set_message(Self::label(task)),
            TaskState::Succeeded => self.bar.inc(1),
            TaskState::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.bar
                    .println(format!("  {} {}", style("✗").red(), Self::label(task)));
                self.bar.inc(1);
            }
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, worker_log_args: Vec<String>) -> Result<()> {
    let registry = Registry::global().context("Failed to build the provider registry")?;

    let mut suite = Suite::read(&args.suite)
        .with_context(|| format!("Failed to load suite {}", args.suite.display()))?;
    suite.apply_overrides(&args.unoptimization_overrides());
    suite
        .validate(&registry)
        .with_context(|| format!("Invalid suite {}", args.suite.display()))?;

    let options = RunOptions {
        parallelism: args.parallel.unwrap_or_else(default_parallelism),
        isolation: args.isolation,
        filters: args.task_filters(),
    };
    let metadata = RunMetadata::capture(args.identity()?);

    let dispatcher: Arc<dyn TaskDispatcher> = match options.isolation {
        Isolation::Process => Arc::new(
            SubprocessDispatcher::current_exe(worker_log_args)
                .context("Failed to locate the qcbench executable")?,
        ),
        Isolation::InProcess => Arc::new(InProcessDispatcher::new(Arc::clone(&registry))),
    };
    let runner = Runner::new(options, dispatcher);
    let total = runner.expand(&suite)?.len();

    println!(
        "{} Running suite {} ({} tasks)",
        style("→").cyan().bold(),
        style(&suite.id).green(),
        total
    );
    let reporter = Arc::new(ProgressReporter::new(total));
    let runner = runner.with_observer(reporter.clone());
    let results = runner.execute(suite, metadata).await?;
    reporter.bar.finish_and_clear();
    let artifacts = write_artifacts(&results, &args.out).context("Failed to write results")?;

    let failed = reporter.failed.load(Ordering::Relaxed);
    let marker = if failed == 0 {
        style("✓").green().bold()
    } else {
        style("!").yellow().bold()
    };
    println!(
        "{} {} tasks, {} failed",
        marker,
        results.results.len(),
        failed
    );
    for result in &results.results {
        let Some(error) = &result.error else { continue };
        println!(
            "  {} {} / {}: {}: {}",
            style("✗").red(),
            result.compiler_id,
            result.benchmark_id,
            error.kind,
            error.message
        );
    }
    println!("  Results: {}", style(artifacts.dir.display()).green());

    Ok(())
}
