//! Shared fixtures: on-disk circuits and suite files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const BELL: &str = r#"OPENQASM 2.0;
include "qelib1.inc";
qreg q[2];
creg c[2];
h q[0];
cx q[0],q[1];
measure q -> c;
"#;

pub const GHZ4: &str = r#"OPENQASM 2.0;
include "qelib1.inc";
qreg q[4];
h q[0];
cx q[0],q[1];
cx q[1],q[2];
cx q[2],q[3];
"#;

pub const QFT3: &str = r#"OPENQASM 2.0;
include "qelib1.inc";
qreg q[3];
x q[0];
h q[2];
cp(pi/2) q[1],q[2];
cp(pi/4) q[0],q[2];
h q[1];
cp(pi/2) q[0],q[1];
h q[0];
swap q[0],q[2];
// Left over by the generator: cancels out.
t q[1];
tdg q[1];
"#;

/// A temporary directory holding `bell.qasm`, `ghz4.qasm` and `qft3.qasm`.
pub fn circuit_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, body) in [("bell.qasm", BELL), ("ghz4.qasm", GHZ4), ("qft3.qasm", QFT3)] {
        std::fs::write(dir.path().join(name), body).expect("write circuit");
    }
    dir
}

/// Write `body` as `suite.toml` in `dir`.
pub fn write_suite(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("suite.toml");
    std::fs::write(&path, body).expect("write suite");
    path
}

/// Two compilers, three benchmarks, one simulated.
pub const SMOKE_SUITE: &str = r#"
spec_version = "1"
suite_version = "2025.1"
id = "smoke"
output_metrics = ["gate_count_ratio"]

[[compilers]]
id = "translate"

[[compilers]]
id = "peephole"
display_name = "Peephole"

[[benchmarks]]
id = "bell"
qasm_file = "bell.qasm"
qubit_count = 2

[[benchmarks]]
id = "ghz4"
qasm_file = "ghz4.qasm"
simulate = { measurement = "ghz_state_projector" }

[[benchmarks]]
id = "qft3"
qasm_file = "qft3.qasm"
"#;
