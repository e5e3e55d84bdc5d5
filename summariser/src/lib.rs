//! Summarise fio benchmark runs.
//!
//! A fio JSON trace is turned into one [model::JobRecord] per job, with the wall-clock window the
//! job ran in reconstructed from the trace. Telemetry for each window is then fetched through a
//! [perfmetrics_telemetry::TelemetryClient], one stream at a time, and lined up into
//! [model::CorrelatedRow]s. Both kinds of row are written to a [sink::ReportSink].

pub mod catalog;
pub mod config;
pub mod correlate;
pub mod extract;
pub mod model;
pub mod parse;
mod pipeline;
pub mod sink;
pub mod unit;
pub mod window;

pub use pipeline::{JobFailure, RunSummary, Summariser};
