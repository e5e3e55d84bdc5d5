use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser as _;
use log::debug;
use perfmetrics_summariser::sink::JsonlSink;
use perfmetrics_summariser::Summariser;
use perfmetrics_telemetry::InfluxTelemetryClient;
use perfmetrics_trace_model::load_trace_from_file;
use std::fs::File;

pub(crate) mod cli;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::CliArgs::try_parse()?;
    log::info!("{CRATE_NAME} {CRATE_VERSION}");

    let config = args.config()?;
    debug!(
        "Fetching {} streams for instance {} from {}",
        config.streams.len(),
        config.instance_id,
        config.influx.host
    );

    debug!("Loading trace from {}", args.trace.display());
    let trace = load_trace_from_file(&args.trace)
        .with_context(|| format!("Failed to load trace from {}", args.trace.display()))?;

    let client = InfluxTelemetryClient::new(config.influx.clone());
    let sink = JsonlSink::new(config.output_dir.clone());
    let report_path = config.output_dir.join(format!(
        "summariser-report-{}.json",
        Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
    ));

    let mut summariser = Summariser::new(client, sink, config);
    let summary = summariser.run(&trace).await?;

    let report = File::create_new(&report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;
    serde_json::to_writer_pretty(report, &summary)?;
    log::info!("Wrote run summary to {}", report_path.display());

    // If any job failed and errors should not explicitly be ignored, return an error
    if !summary.is_success() {
        let error_message = format!(
            "{} out of {} jobs failed:\n{:#?}",
            summary.failures.len(),
            summary.jobs,
            summary.failures
        );

        if args.ignore_errors {
            log::warn!("{}", error_message);
        } else {
            return Err(anyhow!(error_message));
        }
    }

    Ok(())
}
