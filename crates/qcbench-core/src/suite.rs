//! Benchmark suite specification.
//!
//! A suite is read from TOML or YAML, optionally patched with command-line
//! unoptimization overrides, then validated against a [`Registry`] in full
//! before any task runs.

use std::path::{Path, PathBuf};

use qcbench_sim::NoiseModel;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::provider::CompilerArgs;
use crate::registry::{ProviderKind, Registry};
use crate::unoptimize::{DecompositionMethod, Strategy, UnoptimizationConfig};

/// The only suite format version this build reads.
pub const SPEC_VERSION: &str = "1";

/// A compiler under benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSpec {
    /// Registry id.
    pub id: String,
    /// Name used in reports; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Expected provider version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Provider arguments.
    #[serde(default)]
    pub compiler_args: CompilerArgs,
}

impl CompilerSpec {
    /// A spec with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            version: None,
            compiler_args: CompilerArgs::new(),
        }
    }

    /// The name used in reports.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Simulation stage of a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSpec {
    /// An observable or output metric id.
    pub measurement: String,
    /// Noise for the density-matrix runs.
    #[serde(default)]
    pub noise: NoiseModel,
}

/// One benchmark circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkSpec {
    /// Unique id within the suite.
    pub id: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// OpenQASM 2 file, relative to the suite file.
    pub qasm_file: PathBuf,
    /// Absolute circuit path, filled in at load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_qasm_file: Option<PathBuf>,
    /// Expected width of the circuit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qubit_count: Option<usize>,
    /// Optional simulation stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate: Option<SimulationSpec>,
}

impl BenchmarkSpec {
    /// The circuit path to load: the resolved path when set.
    pub fn circuit_path(&self) -> &Path {
        self.resolved_qasm_file.as_deref().unwrap_or(&self.qasm_file)
    }
}

/// A registered target device to compile for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDeviceSpec {
    /// Registry id.
    pub id: String,
}

/// A full benchmark suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// Absolute path of the loaded file.
    #[serde(default)]
    pub spec_path: PathBuf,
    /// Format version, must be `"1"`.
    pub spec_version: String,
    /// Version of the suite contents.
    pub suite_version: String,
    /// Suite id, used in the artifact path.
    pub id: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Compilers, in declaration order.
    #[serde(default)]
    pub compilers: Vec<CompilerSpec>,
    /// Benchmarks, in declaration order.
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkSpec>,
    /// Target devices; empty means compile without a device.
    #[serde(default)]
    pub target_devices: Vec<TargetDeviceSpec>,
    /// Output metrics evaluated on every successful compilation.
    #[serde(default)]
    pub output_metrics: Vec<String>,
    /// Pre-compilation unoptimization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unoptimization: Option<UnoptimizationConfig>,
}

/// Suite file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteFormat {
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
}

impl SuiteFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(SuiteFormat::Toml),
            Some("yaml" | "yml") => Ok(SuiteFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Command-line patches to the `[unoptimization]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnoptimizationOverrides {
    /// Turn the stage on.
    pub enable: bool,
    /// Replace `iterations`.
    pub iterations: Option<u32>,
    /// Replace `strategy`.
    pub strategy: Option<Strategy>,
    /// Replace `decomposition_method`.
    pub decomposition_method: Option<DecompositionMethod>,
    /// Replace `optimization_level`.
    pub optimization_level: Option<u8>,
    /// Replace `seed`.
    pub seed: Option<u64>,
    /// Turn off the final re-synthesis.
    pub skip_synthesize: bool,
}

impl UnoptimizationOverrides {
    /// True when no override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch `config` in place.
    pub fn apply_to(&self, config: &mut UnoptimizationConfig) {
        if self.enable {
            config.enabled = true;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(method) = self.decomposition_method {
            config.decomposition_method = method;
        }
        if let Some(level) = self.optimization_level {
            config.optimization_level = level;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if self.skip_synthesize {
            config.synthesize = false;
        }
    }
}

fn ensure_unique<'a>(
    field: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> ConfigResult<()> {
    let mut seen = FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId {
                field,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

impl Suite {
    /// Parse a suite from text without validating it.
    pub fn parse(text: &str, format: SuiteFormat, path: &Path) -> ConfigResult<Self> {
        let mut suite: Suite = match format {
            SuiteFormat::Toml => toml::from_str(text).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            SuiteFormat::Yaml => {
                serde_yaml_ng::from_str(text).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        suite.spec_path = path.to_path_buf();
        Ok(suite)
    }

    /// Read a suite file without validating it.
    ///
    /// `spec_path` is set to the file's absolute path.
    pub fn read(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let format = SuiteFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(io_err)?;
        let absolute = std::path::absolute(path).map_err(io_err)?;
        Self::parse(&text, format, &absolute)
    }

    /// Read and fully validate a suite file.
    pub fn load(path: impl AsRef<Path>, registry: &Registry) -> ConfigResult<Self> {
        let mut suite = Self::read(path)?;
        suite.validate(registry)?;
        Ok(suite)
    }

    /// Apply command-line overrides.
    ///
    /// Any override creates an `[unoptimization]` table when the suite has
    /// none; only `enable` turns the stage on.
    pub fn apply_overrides(&mut self, overrides: &UnoptimizationOverrides) {
        if overrides.is_empty() {
            return;
        }
        let config = self.unoptimization.get_or_insert_with(UnoptimizationConfig::default);
        overrides.apply_to(config);
    }

    /// Validate everything a run depends on and resolve circuit paths.
    ///
    /// Every circuit file is parsed once here so a bad file stops the run
    /// before dispatch.
    pub fn validate(&mut self, registry: &Registry) -> ConfigResult<()> {
        if self.spec_version != SPEC_VERSION {
            return Err(ConfigError::UnsupportedSpecVersion(self.spec_version.clone()));
        }

        ensure_unique("benchmark", self.benchmarks.iter().map(|b| b.id.as_str()))?;
        ensure_unique("compiler", self.compilers.iter().map(|c| c.id.as_str()))?;
        ensure_unique("target_device", self.target_devices.iter().map(|d| d.id.as_str()))?;

        for spec in &self.compilers {
            let compiler = registry.compiler(&spec.id)?;
            if let Some(expected) = &spec.version {
                if expected != compiler.version() {
                    return Err(ConfigError::CompilerVersion {
                        compiler: spec.id.clone(),
                        expected: expected.clone(),
                        actual: compiler.version().to_string(),
                    });
                }
            }
            compiler
                .validate_args(&spec.compiler_args)
                .map_err(|e| ConfigError::CompilerArgs {
                    compiler: spec.id.clone(),
                    message: e.to_string(),
                })?;
        }
        for device in &self.target_devices {
            registry.require(ProviderKind::TargetDevice, &device.id)?;
        }
        for metric in &self.output_metrics {
            registry.require(ProviderKind::OutputMetric, metric)?;
        }

        let base = self.spec_path.parent().map(Path::to_path_buf).unwrap_or_default();
        for benchmark in &mut self.benchmarks {
            validate_benchmark(benchmark, &base, registry)?;
        }

        if let Some(unopt) = &self.unoptimization {
            unopt
                .validate()
                .map_err(|e| ConfigError::Unoptimization(e.to_string()))?;
        }

        info!(
            "Suite '{}' validated: {} compilers, {} benchmarks, {} target devices",
            self.id,
            self.compilers.len(),
            self.benchmarks.len(),
            self.target_devices.len()
        );
        Ok(())
    }

    /// Unoptimization settings when the stage is enabled.
    pub fn active_unoptimization(&self) -> Option<&UnoptimizationConfig> {
        self.unoptimization.as_ref().filter(|u| u.enabled)
    }
}

fn validate_benchmark(
    benchmark: &mut BenchmarkSpec,
    base: &Path,
    registry: &Registry,
) -> ConfigResult<()> {
    if let Some(sim) = &benchmark.simulate {
        let known = registry.contains(ProviderKind::Observable, &sim.measurement)
            || registry.contains(ProviderKind::OutputMetric, &sim.measurement);
        if !known {
            return Err(ConfigError::UnknownMeasurement {
                benchmark: benchmark.id.clone(),
                id: sim.measurement.clone(),
            });
        }
        sim.noise.validate().map_err(|e| ConfigError::InvalidNoise {
            benchmark: benchmark.id.clone(),
            message: e.to_string(),
        })?;
    }

    let resolved = benchmark
        .resolved_qasm_file
        .clone()
        .unwrap_or_else(|| base.join(&benchmark.qasm_file));
    if !resolved.is_file() {
        return Err(ConfigError::MissingCircuit {
            benchmark: benchmark.id.clone(),
            path: resolved,
        });
    }

    let circuit = qcbench_qasm::parse_file(&resolved).map_err(|source| ConfigError::CircuitParse {
        benchmark: benchmark.id.clone(),
        source,
    })?;
    if let Some(declared) = benchmark.qubit_count {
        if declared != circuit.num_qubits() {
            return Err(ConfigError::QubitCountMismatch {
                benchmark: benchmark.id.clone(),
                declared,
                actual: circuit.num_qubits(),
            });
        }
    }
    debug!(
        "Benchmark '{}': {} ({} qubits)",
        benchmark.id,
        resolved.display(),
        circuit.num_qubits()
    );
    benchmark.resolved_qasm_file = Some(resolved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
spec_version = "1"
suite_version = "2025.1"
id = "smoke"

[[compilers]]
id = "peephole"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
"#;

    #[test]
    fn test_parse_minimal_toml() {
        let suite = Suite::parse(MINIMAL, SuiteFormat::Toml, Path::new("/tmp/suite.toml")).unwrap();
        assert_eq!(suite.id, "smoke");
        assert_eq!(suite.compilers[0].display_name(), "peephole");
        assert!(suite.target_devices.is_empty());
        assert!(suite.unoptimization.is_none());
        assert_eq!(suite.spec_path, Path::new("/tmp/suite.toml"));
    }

    #[test]
    fn test_parse_yaml_with_args_and_noise() {
        let yaml = r#"
spec_version: "1"
suite_version: "1"
id: y
compilers:
  - id: fixpoint
    display_name: Fixpoint
    compiler_args:
      max_rounds: 3
benchmarks:
  - id: ghz
    qasm_file: ghz.qasm
    simulate:
      measurement: ghz_state_projector
      noise:
        two_qubit_error: 0.05
"#;
        let suite = Suite::parse(yaml, SuiteFormat::Yaml, Path::new("s.yaml")).unwrap();
        assert_eq!(suite.compilers[0].compiler_args["max_rounds"], 3);
        let noise = suite.benchmarks[0].simulate.as_ref().unwrap().noise;
        assert_eq!(noise.two_qubit_error, 0.05);
        assert_eq!(noise.single_qubit_error, 0.001);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let text = format!("{MINIMAL}\nbogus = 1\n");
        assert!(matches!(
            Suite::parse(&text, SuiteFormat::Toml, Path::new("s.toml")),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn test_ensure_unique() {
        assert!(ensure_unique("compiler", ["a", "b", "c"]).is_ok());
        let err = ensure_unique("target device", ["a", "b", "a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate target device id: a");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SuiteFormat::from_path(Path::new("a.yml")).unwrap(), SuiteFormat::Yaml);
        assert!(SuiteFormat::from_path(Path::new("a.json")).is_err());
    }

    #[test]
    fn test_overrides_create_block_without_enabling() {
        let mut suite = Suite::parse(MINIMAL, SuiteFormat::Toml, Path::new("s.toml")).unwrap();
        suite.apply_overrides(&UnoptimizationOverrides {
            iterations: Some(4),
            ..Default::default()
        });
        let unopt = suite.unoptimization.as_ref().unwrap();
        assert_eq!(unopt.iterations, 4);
        assert!(!unopt.enabled);
        assert!(suite.active_unoptimization().is_none());

        suite.apply_overrides(&UnoptimizationOverrides {
            enable: true,
            skip_synthesize: true,
            ..Default::default()
        });
        let unopt = suite.active_unoptimization().unwrap();
        assert_eq!(unopt.iterations, 4);
        assert!(!unopt.synthesize);
    }

    #[test]
    fn test_empty_overrides_leave_suite_alone() {
        let mut suite = Suite::parse(MINIMAL, SuiteFormat::Toml, Path::new("s.toml")).unwrap();
        suite.apply_overrides(&UnoptimizationOverrides::default());
        assert!(suite.unoptimization.is_none());
    }
}
