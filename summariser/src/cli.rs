use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use perfmetrics_summariser::catalog::{default_streams, load_catalog};
use perfmetrics_summariser::config::{
    SummariserConfig, DEFAULT_ALIGNMENT_PERIOD_SEC, DEFAULT_JOB_WORKSHEET,
    DEFAULT_METRICS_WORKSHEET,
};
use perfmetrics_telemetry::InfluxConfig;

#[derive(Debug, Parser)]
#[command(about, long_about = None)]
pub struct CliArgs {
    /// Path to the fio JSON output to summarise.
    pub trace: PathBuf,

    /// URL of the InfluxDB instance.
    #[arg(long, env = "INFLUX_HOST", default_value = "http://127.0.0.1:8087")]
    pub influxdb_url: String,

    /// InfluxDB bucket name.
    #[arg(long, env = "INFLUX_BUCKET", default_value = "perfmetrics")]
    pub bucket: String,

    /// InfluxDB token for authentication.
    #[arg(long, env = "INFLUX_TOKEN", default_value = "")]
    pub influxdb_token: String,

    /// Name of the instance the benchmark ran on, as tagged in InfluxDB.
    #[arg(long, env = "INSTANCE_NAME")]
    pub instance: String,

    /// Width of each telemetry bucket, in seconds.
    #[arg(long, default_value_t = DEFAULT_ALIGNMENT_PERIOD_SEC)]
    pub period: u64,

    /// Timeout for each telemetry query, in seconds.
    #[arg(long, default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Directory the worksheets are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Worksheet that receives one row per job.
    #[arg(long, default_value = DEFAULT_JOB_WORKSHEET)]
    pub job_worksheet: String,

    /// Worksheet that receives the correlated telemetry rows.
    #[arg(long, default_value = DEFAULT_METRICS_WORKSHEET)]
    pub metrics_worksheet: String,

    /// TOML file listing the telemetry streams to fetch, replacing the built-in streams.
    #[arg(long)]
    pub streams: Option<PathBuf>,

    /// Exit successfully even when some jobs could not be correlated.
    #[arg(long, env = "IGNORE_SUMMARY_ERRORS")]
    pub ignore_errors: bool,
}

impl CliArgs {
    /// Build the [SummariserConfig] described by the arguments.
    pub fn config(&self) -> anyhow::Result<SummariserConfig> {
        let streams = match &self.streams {
            Some(path) => load_catalog(path)
                .with_context(|| format!("Failed to load streams from {}", path.display()))?,
            None => default_streams(),
        };

        let influx = InfluxConfig::default()
            .host(self.influxdb_url.clone())
            .bucket(self.bucket.clone())
            .token(self.influxdb_token.clone());

        Ok(SummariserConfig::default()
            .influx(influx)
            .instance_id(self.instance.clone())
            .alignment_period_sec(self.period)
            .fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .output_dir(self.output_dir.clone())
            .job_worksheet(self.job_worksheet.clone())
            .metrics_worksheet(self.metrics_worksheet.clone())
            .streams(streams))
    }
}
