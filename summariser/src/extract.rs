use crate::model::{JobRecord, LatencyNs};
use crate::unit::{convert_value, UnitError, DEFAULT_SIZE_UNIT, SIZE_KB};
use crate::window::{reconstruct_windows, JobTiming, JobWindow, RampTimeError};
use perfmetrics_trace_model::{FioTrace, GlobalOptions, Phase, RawJobEntry};
use std::fmt;

const DEFAULT_RW: &str = "read";
const DEFAULT_NUMJOBS: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Trace is empty")]
    EmptyTrace,
    #[error("Missing required field `{field}` in {}", location(.job))]
    MissingField { job: Option<usize>, field: String },
    #[error("Invalid `{field}` value '{value}' in {}", location(.job))]
    MalformedValue {
        job: Option<usize>,
        field: &'static str,
        value: String,
    },
    #[error("Invalid `{field}` in {}: {error}", location(.job))]
    Unit {
        job: Option<usize>,
        field: &'static str,
        error: UnitError,
    },
    #[error("Job {job} ends before it starts: start {start_time_sec}, end {end_time_sec}")]
    InvertedWindow {
        job: usize,
        start_time_sec: i64,
        end_time_sec: i64,
    },
    #[error("No metrics could be extracted from the trace")]
    NoMetricsExtracted,
}

fn location(job: &Option<usize>) -> String {
    match job {
        Some(index) => format!("job {index}"),
        None => "trace".to_string(),
    }
}

/// Why a job was left out of the extracted metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a name nor a file size to identify the job by
    NoJobDetails,
    /// The job's window starts and ends in the same second
    EmptyWindow,
    /// Every reported metric is zero
    NoMetrics,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoJobDetails => write!(f, "no job name or file size"),
            SkipReason::EmptyWindow => write!(f, "start time equals end time"),
            SkipReason::NoMetrics => write!(f, "all metrics are zero"),
        }
    }
}

/// Extract a [JobRecord] for every usable job in the trace, in job order.
///
/// Jobs without identifying details, with an empty window or without any non-zero metric are
/// skipped with a warning. Windows are reconstructed for all jobs before any are skipped, so a
/// skipped job still occupies its slot in the timeline.
pub fn extract_metrics(trace: &FioTrace) -> Result<Vec<JobRecord>, ExtractError> {
    if trace.is_empty() {
        return Err(ExtractError::EmptyTrace);
    }

    let jobs = trace
        .jobs
        .as_ref()
        .ok_or_else(|| missing_field(None, "jobs"))?;
    let timestamp_ms = trace
        .timestamp_ms
        .ok_or_else(|| missing_field(None, "timestamp_ms"))?;
    let default_global = GlobalOptions::default();
    let global = trace.global_options.as_ref().unwrap_or(&default_global);

    let resolved = jobs
        .iter()
        .enumerate()
        .map(|(index, job)| ResolvedJob::resolve(index, job, global))
        .collect::<Result<Vec<_>, _>>()?;

    let timings = resolved.iter().map(|job| job.timing).collect::<Vec<_>>();
    let windows = reconstruct_windows(timestamp_ms, global.ramp_time.as_deref(), &timings)
        .map_err(|RampTimeError { job, error }| ExtractError::Unit {
            job,
            field: "ramp_time",
            error,
        })?;

    if let Some((job, window)) = windows
        .iter()
        .enumerate()
        .find(|(_, w)| w.start_time_sec > w.end_time_sec)
    {
        return Err(ExtractError::InvertedWindow {
            job,
            start_time_sec: window.start_time_sec,
            end_time_sec: window.end_time_sec,
        });
    }

    let mut records = Vec::with_capacity(resolved.len());
    for (job, window) in resolved.iter().zip(windows) {
        if let Some(reason) = job.skip_reason(&window) {
            log::warn!(
                "No job details or metrics in trace, skipping job index {}: {reason}",
                job.index
            );
            continue;
        }

        let record = job.accept(window)?;
        log::debug!(
            "Extracted job '{}' [{}, {}]",
            record.name,
            record.start_time_sec,
            record.end_time_sec
        );
        records.push(record);
    }

    if records.is_empty() {
        return Err(ExtractError::NoMetricsExtracted);
    }

    Ok(records)
}

fn missing_field(job: Option<usize>, field: impl Into<String>) -> ExtractError {
    ExtractError::MissingField {
        job,
        field: field.into(),
    }
}

/// A job with its options resolved against the global options and its required fields checked.
///
/// String options stay unconverted until the job is accepted.
struct ResolvedJob<'a> {
    index: usize,
    name: &'a str,
    filesize: Option<&'a str>,
    numjobs: &'a str,
    rw: Phase,
    timing: JobTiming<'a>,
    iops: f64,
    bw: f64,
    io_bytes: u64,
    lat_ns: LatencyNs,
}

impl<'a> ResolvedJob<'a> {
    fn resolve(
        index: usize,
        job: &'a RawJobEntry,
        global: &'a GlobalOptions,
    ) -> Result<Self, ExtractError> {
        let job_options = job.job_options.as_ref();

        let name = job
            .jobname
            .as_deref()
            .ok_or_else(|| missing_field(Some(index), "jobname"))?;
        let filesize = job_options
            .and_then(|o| o.filesize.as_deref())
            .or(global.filesize.as_deref());
        let numjobs = job_options
            .and_then(|o| o.numjobs.as_deref())
            .unwrap_or(DEFAULT_NUMJOBS);
        let ramp_time = job_options.and_then(|o| o.ramp_time.as_deref());

        let rw_option = job_options
            .and_then(|o| o.rw.as_deref())
            .or(global.rw.as_deref())
            .unwrap_or(DEFAULT_RW);
        let rw = Phase::from_rw(rw_option).ok_or_else(|| ExtractError::MalformedValue {
            job: Some(index),
            field: "rw",
            value: rw_option.to_string(),
        })?;

        let phase = job
            .phase(rw)
            .ok_or_else(|| missing_field(Some(index), rw.as_str()))?;
        let required = |value: Option<f64>, field: &str| {
            value.ok_or_else(|| missing_field(Some(index), format!("{rw}.{field}")))
        };

        let runtime_ms = phase
            .runtime
            .ok_or_else(|| missing_field(Some(index), format!("{rw}.runtime")))?;
        let iops = required(phase.iops, "iops")?;
        let bw = required(phase.bw, "bw")?;
        let lat = phase
            .lat_ns
            .as_ref()
            .ok_or_else(|| missing_field(Some(index), format!("{rw}.lat_ns")))?;
        let lat_ns = LatencyNs {
            min: required(lat.min, "lat_ns.min")?,
            max: required(lat.max, "lat_ns.max")?,
            mean: required(lat.mean, "lat_ns.mean")?,
            p20: lat.percentile(20.0).unwrap_or_default(),
            p50: lat.percentile(50.0).unwrap_or_default(),
            p90: lat.percentile(90.0).unwrap_or_default(),
            p95: lat.percentile(95.0).unwrap_or_default(),
        };

        Ok(Self {
            index,
            name,
            filesize,
            numjobs,
            rw,
            timing: JobTiming {
                runtime_ms,
                ramp_time,
            },
            iops,
            bw,
            io_bytes: phase.io_bytes.unwrap_or_default(),
            lat_ns,
        })
    }

    fn skip_reason(&self, window: &JobWindow) -> Option<SkipReason> {
        let no_filesize = self.filesize.map_or(true, str::is_empty);
        if self.name.is_empty() && no_filesize {
            return Some(SkipReason::NoJobDetails);
        }
        if window.is_degenerate() {
            return Some(SkipReason::EmptyWindow);
        }
        let lat = &self.lat_ns;
        if [self.iops, self.bw, lat.min, lat.max, lat.mean]
            .iter()
            .all(|v| *v == 0.0)
        {
            return Some(SkipReason::NoMetrics);
        }

        None
    }

    fn accept(&self, window: JobWindow) -> Result<JobRecord, ExtractError> {
        let filesize = self
            .filesize
            .filter(|filesize| !filesize.is_empty())
            .ok_or_else(|| missing_field(Some(self.index), "filesize"))?;
        let filesize_kb = convert_value(filesize, SIZE_KB, DEFAULT_SIZE_UNIT).map_err(|error| {
            ExtractError::Unit {
                job: Some(self.index),
                field: "filesize",
                error,
            }
        })?;
        let threads = self
            .numjobs
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ExtractError::MalformedValue {
                job: Some(self.index),
                field: "numjobs",
                value: self.numjobs.to_string(),
            })?;

        Ok(JobRecord {
            name: self.name.to_string(),
            filesize_kb,
            threads,
            rw: self.rw,
            start_time_sec: window.start_time_sec,
            end_time_sec: window.end_time_sec,
            iops: self.iops,
            bw: self.bw,
            io_bytes: self.io_bytes,
            lat_ns: self.lat_ns.clone(),
        })
    }
}
