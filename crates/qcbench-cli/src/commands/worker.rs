//! Worker command implementation.
//!
//! Spawned by the runner with process isolation; not meant to be run by hand.

use anyhow::{Context, Result};

use qcbench_core::{Registry, run_worker};

/// Execute one task descriptor from stdin and answer on stdout.
pub fn execute() -> Result<()> {
    let registry = Registry::global().context("Failed to build the provider registry")?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_worker(stdin.lock(), stdout.lock(), &registry).context("Worker protocol error")
}
