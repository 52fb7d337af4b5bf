//! Suite files on disk: loading, path resolution and every validation
//! failure that must abort a run before dispatch.

mod common;

use qcbench_core::{ConfigError, Registry, Suite, UnoptimizationOverrides};
use qcbench_core::unoptimize::Strategy;

use common::{SMOKE_SUITE, circuit_dir, write_suite};

fn load_err(body: &str) -> ConfigError {
    let dir = circuit_dir();
    let path = write_suite(dir.path(), body);
    Suite::load(&path, &Registry::builtin().unwrap()).unwrap_err()
}

fn with_header(rest: &str) -> String {
    format!("spec_version = \"1\"\nsuite_version = \"1\"\nid = \"v\"\n{rest}")
}

#[test]
fn test_load_resolves_circuit_paths() {
    let dir = circuit_dir();
    let path = write_suite(dir.path(), SMOKE_SUITE);
    let suite = Suite::load(&path, &Registry::builtin().unwrap()).unwrap();

    assert!(suite.spec_path.is_absolute());
    for benchmark in &suite.benchmarks {
        let resolved = benchmark.resolved_qasm_file.as_ref().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.starts_with(dir.path()));
        assert_eq!(benchmark.circuit_path(), resolved.as_path());
    }
}

#[test]
fn test_load_yaml_suite() {
    let dir = circuit_dir();
    let path = dir.path().join("suite.yml");
    std::fs::write(
        &path,
        r#"
spec_version: "1"
suite_version: "1"
id: yaml
compilers:
  - id: fixpoint
    compiler_args:
      max_rounds: 2
benchmarks:
  - id: bell
    qasm_file: bell.qasm
target_devices:
  - id: grid_5x5
"#,
    )
    .unwrap();
    let suite = Suite::load(&path, &Registry::builtin().unwrap()).unwrap();
    assert_eq!(suite.target_devices[0].id, "grid_5x5");
}

#[test]
fn test_duplicate_benchmark_id() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"

[[benchmarks]]
id = "bell"
qasm_file = "ghz4.qasm"
"#,
    ));
    assert_eq!(err.to_string(), "Duplicate benchmark id: bell");
}

#[test]
fn test_missing_circuit_file() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "gone"
qasm_file = "gone.qasm"
"#,
    ));
    assert!(matches!(err, ConfigError::MissingCircuit { .. }), "{err}");
}

#[test]
fn test_unparseable_circuit() {
    let dir = circuit_dir();
    std::fs::write(dir.path().join("bad.qasm"), "OPENQASM 2.0;\nqreg q[1];\nfoo q[0];\n").unwrap();
    let path = write_suite(
        dir.path(),
        &with_header(
            r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "bad"
qasm_file = "bad.qasm"
"#,
        ),
    );
    let err = Suite::load(&path, &Registry::builtin().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::CircuitParse { .. }), "{err}");
}

#[test]
fn test_unknown_compiler() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "nope"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
"#,
    ));
    assert_eq!(err.to_string(), "No compiler registered with id 'nope'");
}

#[test]
fn test_bad_spec_version() {
    let err = load_err(
        r#"
spec_version = "2"
suite_version = "1"
id = "v"
"#,
    );
    assert!(matches!(err, ConfigError::UnsupportedSpecVersion(ref v) if v == "2"));
}

#[test]
fn test_qubit_count_mismatch() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
qubit_count = 3
"#,
    ));
    assert!(matches!(
        err,
        ConfigError::QubitCountMismatch {
            declared: 3,
            actual: 2,
            ..
        }
    ));
}

#[test]
fn test_unknown_measurement_and_metric() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
simulate = { measurement = "energy" }
"#,
    ));
    assert!(matches!(err, ConfigError::UnknownMeasurement { .. }));

    let err = load_err(&with_header(
        r#"
output_metrics = ["fidelity"]

[[compilers]]
id = "translate"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
"#,
    ));
    assert!(matches!(err, ConfigError::Registry(_)));
}

#[test]
fn test_compiler_version_and_args() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"
version = "0.0.0-nope"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
"#,
    ));
    assert!(matches!(err, ConfigError::CompilerVersion { .. }));

    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "fixpoint"
compiler_args = { max_rounds = -1 }

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
"#,
    ));
    assert!(matches!(err, ConfigError::CompilerArgs { .. }));
}

#[test]
fn test_random_without_seed_when_reproducible() {
    let err = load_err(&with_header(
        r#"
[[compilers]]
id = "translate"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"

[unoptimization]
enabled = true
strategy = "random"
reproducible = true
"#,
    ));
    assert!(matches!(err, ConfigError::Unoptimization(_)));
}

#[test]
fn test_overrides_revalidated() {
    let dir = circuit_dir();
    let path = write_suite(dir.path(), SMOKE_SUITE);
    let registry = Registry::builtin().unwrap();
    let mut suite = Suite::read(&path).unwrap();
    suite.apply_overrides(&UnoptimizationOverrides {
        enable: true,
        strategy: Some(Strategy::Random),
        seed: Some(3),
        ..Default::default()
    });
    suite.validate(&registry).unwrap();

    let unopt = suite.active_unoptimization().unwrap();
    assert_eq!(unopt.strategy, Strategy::Random);
    assert_eq!(unopt.seed, Some(3));

    suite.apply_overrides(&UnoptimizationOverrides {
        optimization_level: Some(7),
        ..Default::default()
    });
    assert!(suite.validate(&registry).is_err());
}
