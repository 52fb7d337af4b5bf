//! End-to-end tests of the `qcbench` binary.
//!
//! These spawn the built executable, so `run` with process isolation
//! exercises the real worker protocol.

use std::path::Path;
use std::process::{Command, Output};

use qcbench_core::{SuiteResults, TaskStatus};

const BELL: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n";
const GHZ3: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[3];\nh q[0];\ncx q[0],q[1];\ncx q[1],q[2];\n";
const SWAPS: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[3];\nx q[0];\nswap q[0],q[1];\nswap q[1],q[2];\nt q[2];\n";

const SUITE: &str = r#"
spec_version = "1"
suite_version = "2025.1"
id = "cli"
output_metrics = ["two_qubit_gate_ratio"]

[[compilers]]
id = "translate"

[[compilers]]
id = "fixpoint"
compiler_args = { max_rounds = 4 }

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"

[[benchmarks]]
id = "ghz3"
qasm_file = "ghz3.qasm"
simulate = { measurement = "ghz_state_projector" }

[[benchmarks]]
id = "swaps"
qasm_file = "swaps.qasm"
"#;

fn qcbench(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qcbench"))
        .args(args)
        .current_dir(dir)
        .env_remove("QCBENCH_OUT")
        .env_remove("QCBENCH_RUNNER_NAME")
        .env_remove("QCBENCH_PARALLEL")
        .env_remove("QCBENCH_LOG")
        .output()
        .expect("failed to run qcbench")
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [("bell.qasm", BELL), ("ghz3.qasm", GHZ3), ("swaps.qasm", SWAPS)] {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    std::fs::write(dir.path().join("suite.toml"), SUITE).unwrap();
    dir
}

fn read_results(dir: &Path) -> SuiteResults {
    let path = dir.join("out/ci/cli/20250102T030405Z_abc/results.json");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_list_shows_every_kind() {
    let dir = tempfile::tempdir().unwrap();
    let out = qcbench(&["list"], dir.path());
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for id in ["translate", "fixpoint", "qaoa", "gate_count_ratio", "heavy_hex_27"] {
        assert!(stdout.contains(id), "missing {id} in:\n{stdout}");
    }
}

#[test]
fn test_run_with_worker_processes() {
    let dir = workspace();
    let out = qcbench(
        &[
            "run",
            "suite.toml",
            "-o",
            "out",
            "--runner-name",
            "ci",
            "--uid",
            "abc",
            "--uid-timestamp",
            "2025-01-02T03:04:05Z",
            "-j",
            "2",
        ],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let results = read_results(dir.path());
    assert_eq!(results.results.len(), 6);
    assert!(results.results.iter().all(|r| r.status == TaskStatus::Succeeded));
    assert_eq!(results.metadata.uid, "abc");
    assert!(results.metadata.run_end.is_some());

    let ids: Vec<&str> = results.results.iter().map(|r| r.benchmark_id.as_str()).collect();
    assert_eq!(ids, vec!["bell", "ghz3", "swaps", "bell", "ghz3", "swaps"]);
    assert!(results.results[1].simulation.is_some());

    // One worker process per task.
    let pids: std::collections::BTreeSet<u32> =
        results.results.iter().map(|r| r.metadata.worker_pid).collect();
    assert_eq!(pids.len(), 6);

    let csv = std::fs::read_to_string(dir.path().join("out/ci/cli/20250102T030405Z_abc/results.csv")).unwrap();
    assert_eq!(csv.lines().count(), 7);
}

#[test]
fn test_run_refuses_to_overwrite() {
    let dir = workspace();
    let args = [
        "run",
        "suite.toml",
        "-o",
        "out",
        "--runner-name",
        "ci",
        "--uid",
        "abc",
        "--uid-timestamp",
        "2025-01-02T03:04:05Z",
        "--isolation",
        "in-process",
        "--only-benchmark",
        "bell",
    ];
    assert!(qcbench(&args, dir.path()).status.success());
    assert_eq!(read_results(dir.path()).results.len(), 2);

    let again = qcbench(&args, dir.path());
    assert_eq!(again.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&again.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("already exists"), "{stderr}");
}

#[test]
fn test_invalid_suite_fails_before_running() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("dup.toml"),
        "spec_version = \"1\"\nsuite_version = \"1\"\nid = \"dup\"\n\n[[compilers]]\nid = \"translate\"\n\n[[benchmarks]]\nid = \"bell\"\nqasm_file = \"bell.qasm\"\n\n[[benchmarks]]\nid = \"bell\"\nqasm_file = \"ghz3.qasm\"\n",
    )
    .unwrap();

    let out = qcbench(&["run", "dup.toml", "-o", "out"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Duplicate benchmark id: bell"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unknown_filter_is_fatal() {
    let dir = workspace();
    let out = qcbench(&["run", "suite.toml", "-o", "out", "--only-compiler", "nope"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--only-compiler 'nope'"));
}

#[test]
fn test_unoptimize_writes_equivalent_larger_circuit() {
    let dir = workspace();
    let run = |output: &str| {
        qcbench(
            &[
                "unoptimize",
                "ghz3.qasm",
                "-o",
                output,
                "--strategy",
                "random",
                "--seed",
                "42",
                "--iterations",
                "3",
            ],
            dir.path(),
        )
    };
    assert!(run("a.qasm").status.success());
    assert!(run("b.qasm").status.success());

    let a = std::fs::read_to_string(dir.path().join("a.qasm")).unwrap();
    let b = std::fs::read_to_string(dir.path().join("b.qasm")).unwrap();
    assert_eq!(a, b);
    assert!(a.starts_with("// Unoptimized by qcbench"));
    assert!(a.contains("seed=42"));

    let grown = qcbench_qasm::parse(&a).unwrap();
    let original = qcbench_qasm::parse(GHZ3).unwrap();
    assert!(grown.gate_count() > original.gate_count());
    assert_eq!(grown.num_qubits(), 3);
}

#[test]
fn test_worker_rejects_garbage() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(env!("CARGO_BIN_EXE_qcbench"))
        .arg("worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"not a task").unwrap();
    let out = child.wait_with_output().unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}
