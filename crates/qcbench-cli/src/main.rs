//! qcbench command-line interface
//!
//! ```text
//! qcbench run suite.toml -j 8          benchmark every compiler on every circuit
//! qcbench unoptimize in.qasm -o out    grow a circuit with identity blocks
//! qcbench list                         show registered providers
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{list, run, unoptimize, worker};

/// qcbench - benchmark quantum circuit compilers
#[derive(Parser, Debug)]
#[command(name = "qcbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log filter, overrides -v (e.g. "debug" or "qcbench_compile=trace")
    #[arg(long, global = true, env = "QCBENCH_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a benchmark suite and write its result artifact
    Run(run::RunArgs),

    /// Unoptimize a circuit and write it as OpenQASM 2.0
    Unoptimize(unoptimize::UnoptimizeArgs),

    /// List registered compilers, observables, output metrics and target devices
    List,

    /// Execute one task descriptor read from stdin
    #[command(hide = true)]
    Worker,
}

impl Cli {
    fn log_filter(&self) -> String {
        match &self.log_level {
            Some(level) => level.clone(),
            None => match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
            .to_string(),
        }
    }

    /// Logging flags forwarded to worker processes.
    fn worker_log_args(&self) -> Vec<String> {
        match &self.log_level {
            Some(level) => vec!["--log-level".to_string(), level.clone()],
            None if self.verbose > 0 => vec![format!("-{}", "v".repeat(self.verbose.into()))],
            None => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the worker protocol; logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_filter()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let worker_log_args = cli.worker_log_args();
    let result = match cli.command {
        Commands::Run(args) => run::execute(args, worker_log_args).await,
        Commands::Unoptimize(args) => unoptimize::execute(&args),
        Commands::List => list::execute(),
        Commands::Worker => worker::execute(),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
