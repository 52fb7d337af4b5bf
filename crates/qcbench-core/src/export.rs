//! Result artifacts: `results.json` and `results.csv`.
//!
//! Artifacts live at `<out>/<runner_name>/<suite_id>/<uid_timestamp>_<uid>/`
//! and are written exactly once; an existing artifact is never overwritten.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ResultsError, ResultsResult};
use crate::results::SuiteResults;

/// JSON artifact file name.
pub const RESULTS_JSON: &str = "results.json";
/// CSV artifact file name.
pub const RESULTS_CSV: &str = "results.csv";

/// Paths of a written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub dir: PathBuf,
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Keep a user-supplied name from escaping its directory.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.+".contains(c) { c } else { '_' })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Directory a run's artifact is written to.
pub fn artifact_dir(out: &Path, results: &SuiteResults) -> PathBuf {
    out.join(path_component(&results.metadata.runner_name))
        .join(path_component(&results.suite.id))
        .join(path_component(&results.metadata.artifact_dir_name()))
}

/// Pretty-printed JSON document.
pub fn to_json(results: &SuiteResults) -> ResultsResult<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: impl IntoIterator<Item = String>) -> String {
    let mut row = fields
        .into_iter()
        .map(|f| csv_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

/// One CSV row per result.
///
/// Output metrics and simulation values get one column each (`metric:<id>`,
/// `sim:<name>`), taken from the union over all results.
pub fn to_csv(results: &SuiteResults) -> String {
    let metric_ids: BTreeSet<&str> = results
        .results
        .iter()
        .flat_map(|r| r.compilation.output_metrics.keys().map(String::as_str))
        .collect();
    let sim_keys: BTreeSet<&str> = results
        .results
        .iter()
        .filter_map(|r| r.simulation.as_ref())
        .flat_map(|s| s.iter().map(|(k, _)| k))
        .collect();

    let mut header: Vec<String> = [
        "suite_id",
        "suite_version",
        "uid",
        "uid_timestamp",
        "runner_name",
        "compiler_id",
        "compiler_version",
        "benchmark_id",
        "target_device_id",
        "status",
        "error_kind",
        "error_message",
        "wall_time_seconds",
        "raw_gate_count",
        "gate_count",
        "raw_two_qubit_gate_count",
        "two_qubit_gate_count",
        "raw_depth",
        "depth",
        "unopt_iterations",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(metric_ids.iter().map(|id| format!("metric:{id}")));
    header.extend(sim_keys.iter().map(|key| format!("sim:{key}")));
    header.push("simulation_error".into());

    let mut out = csv_row(header);
    let meta = &results.metadata;
    for r in &results.results {
        let c = &r.compilation;
        let mut row = vec![
            results.suite.id.clone(),
            results.suite.suite_version.clone(),
            meta.uid.clone(),
            meta.uid_timestamp.to_rfc3339(),
            meta.runner_name.clone(),
            r.compiler_id.clone(),
            r.compiler_version.clone(),
            r.benchmark_id.clone(),
            r.target_device_id.clone().unwrap_or_default(),
            if r.succeeded() { "succeeded" } else { "failed" }.to_string(),
            r.error.as_ref().map(|e| e.kind.to_string()).unwrap_or_default(),
            r.error.as_ref().map(|e| e.message.clone()).unwrap_or_default(),
            c.wall_time_seconds.to_string(),
            c.raw_gate_count.to_string(),
            c.gate_count.to_string(),
            c.raw_two_qubit_gate_count.to_string(),
            c.two_qubit_gate_count.to_string(),
            c.raw_depth.to_string(),
            c.depth.to_string(),
            r.unoptimization
                .as_ref()
                .map(|u| u.iterations_applied.to_string())
                .unwrap_or_default(),
        ];
        row.extend(
            metric_ids
                .iter()
                .map(|id| c.output_metrics.get(*id).map(f64::to_string).unwrap_or_default()),
        );
        row.extend(sim_keys.iter().map(|key| {
            r.simulation
                .as_ref()
                .and_then(|s| s.get(key))
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        row.push(r.simulation_error.clone().unwrap_or_default());
        out.push_str(&csv_row(row));
    }
    out
}

fn write_new(path: &Path, contents: &str) -> ResultsResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                ResultsError::AlreadyExists(path.to_path_buf())
            } else {
                ResultsError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
    file.write_all(contents.as_bytes())
        .map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Write both artifacts under `out`. Fails without writing anything if
/// either file already exists.
pub fn write_artifacts(results: &SuiteResults, out: &Path) -> ResultsResult<Artifacts> {
    let dir = artifact_dir(out, results);
    let json = dir.join(RESULTS_JSON);
    let csv = dir.join(RESULTS_CSV);
    for path in [&json, &csv] {
        if path.exists() {
            return Err(ResultsError::AlreadyExists(path.clone()));
        }
    }

    let json_text = to_json(results)?;
    let csv_text = to_csv(results);
    std::fs::create_dir_all(&dir).map_err(|source| ResultsError::Io {
        path: dir.clone(),
        source,
    })?;
    write_new(&json, &json_text)?;
    write_new(&csv, &csv_text)?;
    info!("Wrote results to {}", dir.display());

    Ok(Artifacts { dir, json, csv })
}
