//! Run identity and environment capture.
//!
//! Everything needed to find a run's artifact again and to tell which
//! machine and build produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hardware and OS of the machine that ran the suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSpecs {
    /// Operating system (`std::env::consts::OS`).
    pub os: String,
    /// CPU architecture (`std::env::consts::ARCH`).
    pub arch: String,
    /// Logical CPUs available to this process.
    pub logical_cpus: usize,
}

impl RunnerSpecs {
    /// Capture the current machine.
    pub fn capture() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cpus: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

/// Caller-supplied parts of the run identity. Unset fields are generated.
#[derive(Debug, Clone, Default)]
pub struct RunIdentity {
    /// Run id; a v4 UUID when unset.
    pub uid: Option<String>,
    /// Run timestamp; now when unset.
    pub uid_timestamp: Option<DateTime<Utc>>,
    /// Machine label; the host name when unset.
    pub runner_name: Option<String>,
    /// Command line of the run.
    pub runner_args: Vec<String>,
    /// Revision of the compiler sources under test.
    pub ucc_hash: Option<String>,
    /// Commit time of that revision.
    pub ucc_timestamp: Option<String>,
}

/// Metadata attached to a result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub uid: String,
    pub uid_timestamp: DateTime<Utc>,
    pub run_start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_end: Option<DateTime<Utc>>,
    pub runner_name: String,
    pub runner_specs: RunnerSpecs,
    pub runner_version: String,
    pub runner_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ucc_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ucc_timestamp: Option<String>,
}

impl RunMetadata {
    /// Start a run now.
    pub fn capture(identity: RunIdentity) -> Self {
        let run_start = Utc::now();
        Self {
            uid: identity.uid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            uid_timestamp: identity.uid_timestamp.unwrap_or(run_start),
            run_start,
            run_end: None,
            runner_name: identity.runner_name.unwrap_or_else(host_name),
            runner_specs: RunnerSpecs::capture(),
            runner_version: env!("CARGO_PKG_VERSION").to_string(),
            runner_args: identity.runner_args,
            ucc_hash: identity.ucc_hash,
            ucc_timestamp: identity.ucc_timestamp,
        }
    }

    /// Mark the run finished.
    pub fn finish(&mut self) {
        self.run_end = Some(Utc::now());
    }

    /// Directory name of this run's artifact: `<uid_timestamp>_<uid>`.
    pub fn artifact_dir_name(&self) -> String {
        format!("{}_{}", self.uid_timestamp.format("%Y%m%dT%H%M%SZ"), self.uid)
    }
}

/// Parse an RFC 3339 timestamp given on the command line.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

/// Host name from `HOSTNAME` or `/etc/hostname`, `"unknown"` otherwise.
pub fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
