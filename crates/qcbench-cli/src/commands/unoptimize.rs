//! Unoptimize command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use qcbench_core::unoptimize::{DecompositionMethod, Strategy};
use qcbench_core::{UnoptimizationConfig, UnoptimizeReport, unoptimize};
use qcbench_ir::Circuit;

/// Options of `qcbench unoptimize`.
#[derive(Args, Debug)]
pub struct UnoptimizeArgs {
    /// Input circuit (OpenQASM 2.0)
    pub input: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of insertions
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,

    /// Insertion strategy (concatenated, random)
    #[arg(long, default_value_t = Strategy::Concatenated)]
    pub strategy: Strategy,

    /// Block decomposition (default, kak, basis)
    #[arg(long, default_value_t = DecompositionMethod::Default)]
    pub decomposition: DecompositionMethod,

    /// Optimization level of the final re-synthesis (0-3)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub opt_level: u8,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the final re-synthesis
    #[arg(long)]
    pub skip_synth: bool,
}

impl UnoptimizeArgs {
    fn config(&self) -> UnoptimizationConfig {
        UnoptimizationConfig {
            enabled: true,
            iterations: self.iterations,
            strategy: self.strategy,
            decomposition_method: self.decomposition,
            optimization_level: self.opt_level,
            seed: self.seed,
            synthesize: !self.skip_synth,
            ..UnoptimizationConfig::default()
        }
    }
}

/// Comment block recording how a circuit was produced.
fn header(config: &UnoptimizationConfig, report: &UnoptimizeReport, source: &Circuit) -> String {
    let seed = config
        .seed
        .map_or_else(|| "none".to_string(), |s| s.to_string());
    format!(
        "// Unoptimized by qcbench {} from '{}'\n\
         // iterations={} strategy={} decomposition={} opt_level={} seed={} synthesize={}\n\
         // gates: {} -> {}, two-qubit gates: {} -> {}\n",
        env!("CARGO_PKG_VERSION"),
        source.name(),
        config.iterations,
        config.strategy,
        config.decomposition_method,
        config.optimization_level,
        seed,
        config.synthesize,
        report.gate_count_before,
        report.gate_count_after,
        report.two_qubit_gate_count_before,
        report.two_qubit_gate_count_after,
    )
}

/// Execute the unoptimize command.
pub fn execute(args: &UnoptimizeArgs) -> Result<()> {
    println!(
        "{} Unoptimizing {}",
        style("→").cyan().bold(),
        style(args.input.display()).green()
    );

    let circuit = qcbench_qasm::parse_file(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let config = args.config();
    let (grown, report) = unoptimize(&circuit, &config)?;
    for warning in &report.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }

    let body = qcbench_qasm::emit(&grown).context("Failed to emit OpenQASM")?;
    let text = format!("{}{}", header(&config, &report, &circuit), body);
    fs::write(&args.output, text)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "{} {} -> {} gates ({} iterations applied)",
        style("✓").green().bold(),
        report.gate_count_before,
        report.gate_count_after,
        report.iterations_applied
    );
    println!("  Output: {}", style(args.output.display()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_records_settings() {
        let config = UnoptimizationConfig {
            enabled: true,
            iterations: 2,
            strategy: Strategy::Random,
            seed: Some(42),
            ..UnoptimizationConfig::default()
        };
        let report = UnoptimizeReport {
            iterations_applied: 2,
            gate_count_before: 3,
            gate_count_after: 40,
            two_qubit_gate_count_before: 2,
            two_qubit_gate_count_after: 12,
            ..UnoptimizeReport::default()
        };
        let source = Circuit::ghz(3).unwrap();
        let text = header(&config, &report, &source);

        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|l| l.starts_with("// ")));
        assert!(text.contains("strategy=random"));
        assert!(text.contains("seed=42"));
        assert!(text.contains("gates: 3 -> 40"));
    }
}
