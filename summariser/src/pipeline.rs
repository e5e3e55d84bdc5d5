use crate::config::SummariserConfig;
use crate::correlate::{correlate_streams, NamedStream};
use crate::extract::extract_metrics;
use crate::model::{CorrelatedRow, JobRecord, Row};
use crate::parse::parse_metric_points;
use crate::sink::ReportSink;
use anyhow::Context;
use chrono::DateTime;
use perfmetrics_telemetry::{fetch_with_timeout, TelemetryClient, TimeSeriesQuery};
use perfmetrics_trace_model::FioTrace;
use serde::Serialize;

/// The outcome of summarising one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Jobs accepted from the trace
    pub jobs: usize,
    pub job_rows_written: usize,
    pub metric_rows_written: usize,
    pub failures: Vec<JobFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A job whose telemetry could not be correlated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub job: String,
    pub error: String,
}

/// Turns a fio trace into job rows and, per job, rows of correlated telemetry.
pub struct Summariser<C, S> {
    client: C,
    sink: S,
    config: SummariserConfig,
}

impl<C, S> Summariser<C, S>
where
    C: TelemetryClient,
    S: ReportSink,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(client: C, sink: S, config: SummariserConfig) -> Self {
        Self {
            client,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Extract the jobs of `trace`, write them, then fetch and write the telemetry of each job.
    ///
    /// Extraction and sink errors abort the run. Anything that goes wrong while fetching a job's
    /// telemetry is recorded in the returned [RunSummary] and the run moves on to the next job.
    pub async fn run(&mut self, trace: &FioTrace) -> anyhow::Result<RunSummary> {
        let jobs = extract_metrics(trace).context("Failed to extract job metrics from trace")?;
        log::info!("Extracted {} jobs from trace", jobs.len());

        let job_rows = jobs.iter().map(JobRecord::to_row).collect::<Vec<_>>();
        self.sink
            .append_rows(&self.config.job_worksheet, &job_rows)
            .with_context(|| format!("Failed to write to {}", self.config.job_worksheet))?;

        let mut summary = RunSummary {
            jobs: jobs.len(),
            job_rows_written: job_rows.len(),
            ..Default::default()
        };

        for job in &jobs {
            let rows = match self.correlate_job(job).await {
                Ok(rows) => rows,
                Err(e) => {
                    log::error!("Failed to correlate telemetry for job '{}': {e:#}", job.name);
                    summary.failures.push(JobFailure {
                        job: job.name.clone(),
                        error: format!("{e:#}"),
                    });
                    continue;
                }
            };

            let worksheet = self.config.job_metrics_worksheet(&job.name);
            let rows = rows.iter().map(CorrelatedRow::to_row).collect::<Vec<Row>>();
            self.sink
                .append_rows(&worksheet, &rows)
                .with_context(|| format!("Failed to write to {worksheet}"))?;
            summary.metric_rows_written += rows.len();
        }

        log::info!(
            "Wrote {} job rows and {} metric rows, {} of {} jobs failed",
            summary.job_rows_written,
            summary.metric_rows_written,
            summary.failures.len(),
            summary.jobs,
        );

        Ok(summary)
    }

    /// Fetch every catalog stream for the job's window, one at a time, and line them up.
    async fn correlate_job(&self, job: &JobRecord) -> anyhow::Result<Vec<CorrelatedRow>> {
        let window = job.window();
        window.validate()?;
        log::info!(
            "Fetching telemetry for job '{}' from {} to {}",
            job.name,
            display_time(window.start_time_sec),
            display_time(window.end_time_sec),
        );

        let mut streams = Vec::with_capacity(self.config.streams.len());
        for stream in &self.config.streams {
            let query = TimeSeriesQuery::new(
                &stream.metric_type,
                window.start_time_sec,
                window.end_time_sec,
                &self.config.instance_id,
                self.config.alignment_period_sec,
                stream.aligner,
            )
            .label_filter(stream.label_filter.clone());
            log::debug!("Querying: {:?}", query);

            let response = fetch_with_timeout(&self.client, &query, self.config.fetch_timeout)
                .await
                .with_context(|| format!("Failed to fetch stream '{}'", stream.name))?;
            log::trace!("Response for '{}': {:?}", stream.name, response);

            let points = parse_metric_points(&stream.metric_type, &response, stream.factor)
                .with_context(|| format!("Failed to parse stream '{}'", stream.name))?;
            streams.push(NamedStream::new(&stream.name, points));
        }

        Ok(correlate_streams(&streams)?)
    }
}

fn display_time(sec: i64) -> String {
    DateTime::from_timestamp(sec, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| sec.to_string())
}
