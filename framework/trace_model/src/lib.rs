use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Output of a fio run with `--output-format=json`.
///
/// Every field is optional at this level. fio omits sections depending on how it was invoked, so
/// deciding which fields are required is left to the consumer of the trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FioTrace {
    /// The time fio finished writing the trace
    ///
    /// This is a Unix timestamp in milliseconds and marks the end of the last job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    /// Options from the `[global]` section of the job file
    #[serde(
        rename = "global options",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub global_options: Option<GlobalOptions>,
    /// The jobs, in the order fio ran them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<RawJobEntry>>,
    /// Anything else fio reports, such as `fio version` or `disk_util`
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl FioTrace {
    /// True when the trace carries no keys at all.
    pub fn is_empty(&self) -> bool {
        self.timestamp_ms.is_none()
            && self.global_options.is_none()
            && self.jobs.is_none()
            && self.other.is_empty()
    }
}

/// Options that apply to every job unless the job overrides them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlobalOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rw: Option<String>,
}

/// Options set on a single job section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobOptions {
    /// Number of clones of this job, reported as the thread count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numjobs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rw: Option<String>,
}

/// A single job as reported by fio.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawJobEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<JobPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<JobPhase>,
    #[serde(
        rename = "job options",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub job_options: Option<JobOptions>,
}

impl RawJobEntry {
    /// Get the measurements for the given phase, if fio reported them.
    pub fn phase(&self, phase: Phase) -> Option<&JobPhase> {
        match phase {
            Phase::Read => self.read.as_ref(),
            Phase::Write => self.write.as_ref(),
        }
    }
}

/// Measurements for one direction of I/O within a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobPhase {
    /// Measured runtime in milliseconds, excluding ramp time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<f64>,
    /// Bandwidth in KiB/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_ns: Option<Latency>,
}

/// Total latency statistics, in nanoseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Latency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Latency percentiles keyed the way fio prints them, e.g. `"95.000000"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<BTreeMap<String, f64>>,
}

impl Latency {
    /// Look up a percentile by its numeric value, e.g. `95.0`.
    pub fn percentile(&self, pct: f64) -> Option<f64> {
        let key = format!("{pct:.6}");
        self.percentile.as_ref()?.get(&key).copied()
    }
}

/// The direction of I/O that a job measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Read,
    Write,
}

impl Phase {
    /// Map a fio `rw` option onto the phase whose measurements it produces.
    ///
    /// Returns [None] for mixed or unknown workloads.
    pub fn from_rw(rw: &str) -> Option<Self> {
        match rw {
            "read" | "randread" => Some(Phase::Read),
            "write" | "randwrite" => Some(Phase::Write),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Read => "read",
            Phase::Write => "write",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error type for [load_trace].
#[derive(Debug, thiserror::Error)]
pub enum TraceLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load a fio trace from a reader
///
/// A JSON `null` document loads as an empty trace.
pub fn load_trace<R: Read>(reader: R) -> Result<FioTrace, TraceLoadError> {
    let reader = std::io::BufReader::new(reader);
    let trace: Option<FioTrace> = serde_json::from_reader(reader)?;
    Ok(trace.unwrap_or_default())
}

/// Load a fio trace from a file
pub fn load_trace_from_file<P: AsRef<Path>>(path: P) -> Result<FioTrace, TraceLoadError> {
    let file = std::fs::File::open(path)?;
    load_trace(file)
}
