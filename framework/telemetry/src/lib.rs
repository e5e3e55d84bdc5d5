//! A narrow interface for fetching aligned time series from a monitoring backend.
//!
//! Consumers only see [TimeSeriesQuery] going in and [TimeSeries] coming out. Any backend that can
//! answer a query with a value-type code and a list of points per series can implement
//! [TelemetryClient]. [InfluxTelemetryClient] is the implementation used in production.

mod client;
mod influx;
mod query;
mod series;

pub use client::{fetch_with_timeout, QueryError, TelemetryClient};
pub use influx::{InfluxConfig, InfluxTelemetryClient};
pub use query::{Aligner, TimeSeriesQuery};
pub use series::{
    Distribution, Point, TimeInterval, TimeSeries, TypedValue, VALUE_TYPE_DISTRIBUTION,
    VALUE_TYPE_DOUBLE, VALUE_TYPE_INT64,
};
