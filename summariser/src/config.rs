use crate::catalog::{default_streams, StreamSpec};
use perfmetrics_telemetry::InfluxConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Bucket width used when querying telemetry, in seconds.
pub const DEFAULT_ALIGNMENT_PERIOD_SEC: u64 = 120;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_JOB_WORKSHEET: &str = "fio_metrics";
pub const DEFAULT_METRICS_WORKSHEET: &str = "vm_metrics";

/// Everything a [crate::Summariser] run needs beyond the trace itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SummariserConfig {
    pub influx: InfluxConfig,
    /// The instance whose telemetry is correlated with the jobs
    pub instance_id: String,
    pub alignment_period_sec: u64,
    pub fetch_timeout: Duration,
    pub output_dir: PathBuf,
    pub job_worksheet: String,
    pub metrics_worksheet: String,
    pub streams: Vec<StreamSpec>,
}

impl Default for SummariserConfig {
    fn default() -> Self {
        Self {
            influx: InfluxConfig::default(),
            instance_id: String::new(),
            alignment_period_sec: DEFAULT_ALIGNMENT_PERIOD_SEC,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            output_dir: PathBuf::from("."),
            job_worksheet: DEFAULT_JOB_WORKSHEET.to_string(),
            metrics_worksheet: DEFAULT_METRICS_WORKSHEET.to_string(),
            streams: default_streams(),
        }
    }
}

impl SummariserConfig {
    /// Builds a [`SummariserConfig`] with the specified InfluxDB connection.
    pub fn influx(mut self, influx: InfluxConfig) -> Self {
        self.influx = influx;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified instance id.
    pub fn instance_id(mut self, instance_id: String) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified alignment period.
    pub fn alignment_period_sec(mut self, alignment_period_sec: u64) -> Self {
        self.alignment_period_sec = alignment_period_sec;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified timeout for each fetch.
    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified output directory.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified job worksheet name.
    pub fn job_worksheet(mut self, job_worksheet: String) -> Self {
        self.job_worksheet = job_worksheet;
        self
    }

    /// Builds a [`SummariserConfig`] with the specified metrics worksheet name.
    pub fn metrics_worksheet(mut self, metrics_worksheet: String) -> Self {
        self.metrics_worksheet = metrics_worksheet;
        self
    }

    /// The worksheet that receives the correlated telemetry of one job.
    pub fn job_metrics_worksheet(&self, job_name: &str) -> String {
        format!("{}_{}", self.metrics_worksheet, job_name)
    }

    /// Builds a [`SummariserConfig`] with the specified stream catalog.
    pub fn streams(mut self, streams: Vec<StreamSpec>) -> Self {
        self.streams = streams;
        self
    }
}
