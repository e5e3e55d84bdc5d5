use crate::window::JobWindow;
use perfmetrics_trace_model::Phase;
use serde::{Deserialize, Serialize};

/// A single cell written to a report sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

/// A fixed-arity row for a report sink.
pub type Row = Vec<Cell>;

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(value.into())
    }
}

/// Values past `i64::MAX` become floats.
impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Cell::Int(value),
            Err(_) => Cell::Float(value as f64),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// Latency statistics of a job, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyNs {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p20: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
}

/// The metrics reported for one accepted fio job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// May be empty when the file size is set
    pub name: String,
    /// File size in kilobyte-equivalents
    pub filesize_kb: f64,
    /// Number of threads, from `numjobs`
    pub threads: u32,
    /// The phase the metrics were taken from
    pub rw: Phase,
    pub start_time_sec: i64,
    pub end_time_sec: i64,
    pub iops: f64,
    /// Bandwidth in KiB/s
    pub bw: f64,
    pub io_bytes: u64,
    pub lat_ns: LatencyNs,
}

impl JobRecord {
    pub fn window(&self) -> JobWindow {
        JobWindow {
            start_time_sec: self.start_time_sec,
            end_time_sec: self.end_time_sec,
        }
    }

    /// The row written to the job worksheet.
    ///
    /// Columns: name, file size (KB), threads, start, end, iops, bandwidth (KiB/s), latency
    /// min/max/mean (ns), rw, io bytes, latency p20/p50/p90/p95 (ns).
    pub fn to_row(&self) -> Row {
        vec![
            self.name.as_str().into(),
            self.filesize_kb.into(),
            self.threads.into(),
            self.start_time_sec.into(),
            self.end_time_sec.into(),
            self.iops.into(),
            self.bw.into(),
            self.lat_ns.min.into(),
            self.lat_ns.max.into(),
            self.lat_ns.mean.into(),
            self.rw.as_str().into(),
            self.io_bytes.into(),
            self.lat_ns.p20.into(),
            self.lat_ns.p50.into(),
            self.lat_ns.p90.into(),
            self.lat_ns.p95.into(),
        ]
    }
}

/// One aligned bucket of a metric stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub interval_start_sec: i64,
    pub interval_end_sec: i64,
}

impl MetricPoint {
    pub fn new(value: f64, interval_start_sec: i64, interval_end_sec: i64) -> Self {
        Self {
            value,
            interval_start_sec,
            interval_end_sec,
        }
    }
}

/// Values of every stream for one aligned bucket, in stream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedRow {
    pub interval_start_sec: i64,
    pub values: Vec<f64>,
}

impl CorrelatedRow {
    /// The row written to the metrics worksheet: interval start, then one value per stream.
    pub fn to_row(&self) -> Row {
        let mut row = Vec::with_capacity(self.values.len() + 1);
        row.push(self.interval_start_sec.into());
        row.extend(self.values.iter().map(|v| Cell::from(*v)));
        row
    }
}
