//! Worker side of the subprocess protocol.
//!
//! A worker reads one [`TaskDescriptor`] as JSON from its input, runs it
//! against its own registry and writes one
//! [`BenchmarkResult`](crate::results::BenchmarkResult) as JSON to its
//! output. Logs go elsewhere; the output stream carries nothing but the
//! result.

use std::io::{Read, Write};

use tracing::debug;

use crate::registry::Registry;
use crate::task::{TaskDescriptor, run_task};

/// Serve one task.
pub fn run_worker(mut input: impl Read, mut output: impl Write, registry: &Registry) -> std::io::Result<()> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    let task: TaskDescriptor = serde_json::from_slice(&buf)?;
    debug!(index = task.index, "Worker received task");

    let result = run_task(&task, registry);
    serde_json::to_writer(&mut output, &result)?;
    output.write_all(b"\n")?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{BenchmarkResult, FailureKind};
    use crate::suite::{BenchmarkSpec, CompilerSpec};

    #[test]
    fn test_worker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.qasm");
        std::fs::write(
            &path,
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n",
        )
        .unwrap();
        let task = TaskDescriptor {
            index: 4,
            suite_id: "w".into(),
            compiler: CompilerSpec::new("translate"),
            benchmark: BenchmarkSpec {
                id: "bell".into(),
                description: String::new(),
                qasm_file: path.clone(),
                resolved_qasm_file: Some(path),
                qubit_count: None,
                simulate: None,
            },
            target_device_id: None,
            unoptimization: None,
            output_metrics: vec![],
        };
        let input = serde_json::to_vec(&task).unwrap();
        let registry = Registry::builtin().unwrap();

        let mut output = Vec::new();
        run_worker(input.as_slice(), &mut output, &registry).unwrap();

        let result: BenchmarkResult = serde_json::from_slice(&output).unwrap();
        assert_eq!(result.index, 4);
        assert!(result.compilation.success, "{:?}", result.error);
    }

    #[test]
    fn test_worker_rejects_garbage() {
        let registry = Registry::builtin().unwrap();
        let mut output = Vec::new();
        let err = run_worker(&b"{not json"[..], &mut output, &registry).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(output.is_empty());
    }

    #[test]
    fn test_failed_task_still_answers() {
        let task = TaskDescriptor {
            index: 0,
            suite_id: "w".into(),
            compiler: CompilerSpec::new("translate"),
            benchmark: BenchmarkSpec {
                id: "missing".into(),
                description: String::new(),
                qasm_file: "/nonexistent.qasm".into(),
                resolved_qasm_file: None,
                qubit_count: None,
                simulate: None,
            },
            target_device_id: None,
            unoptimization: None,
            output_metrics: vec![],
        };
        let registry = Registry::builtin().unwrap();
        let mut output = Vec::new();
        run_worker(serde_json::to_vec(&task).unwrap().as_slice(), &mut output, &registry).unwrap();

        let result: BenchmarkResult = serde_json::from_slice(&output).unwrap();
        assert_eq!(result.error.unwrap().kind, FailureKind::CircuitLoad);
    }
}
