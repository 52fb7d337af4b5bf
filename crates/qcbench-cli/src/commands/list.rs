//! List command implementation.

use anyhow::{Context, Result};
use console::style;

use qcbench_core::{ProviderKind, Registry};

/// Execute the list command.
pub fn execute() -> Result<()> {
    let registry = Registry::global().context("Failed to build the provider registry")?;

    for kind in ProviderKind::ALL {
        println!("{}", style(format!("{kind}s")).bold());
        for id in registry.ids(kind) {
            if kind == ProviderKind::TargetDevice {
                let device = registry.target_device(id)?;
                println!(
                    "  {} ({} qubits, basis {})",
                    style(id).green(),
                    device.num_qubits(),
                    device.basis_gates
                );
            } else {
                println!("  {}", style(id).green());
            }
        }
    }
    Ok(())
}
