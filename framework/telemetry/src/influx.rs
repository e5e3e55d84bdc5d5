use crate::client::{QueryError, TelemetryClient};
use crate::query::{Aligner, TimeSeriesQuery};
use crate::series::{Point, TimeInterval, TimeSeries, TypedValue, VALUE_TYPE_DOUBLE, VALUE_TYPE_INT64};
use futures::future::BoxFuture;
use futures::FutureExt;
use influxdb::ReadQuery;
use serde_json::Value;

/// Connection parameters for [InfluxTelemetryClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub host: String,
    pub bucket: String,
    pub token: String,
    pub retention_policy: String,
    /// Tag that identifies the reporting instance
    pub instance_tag: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:8087".to_string(),
            bucket: "perfmetrics".to_string(),
            token: String::new(),
            retention_policy: "autogen".to_string(),
            instance_tag: "instance_name".to_string(),
        }
    }
}

impl InfluxConfig {
    /// Builds an [InfluxConfig] with the specified host URL.
    pub fn host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Builds an [InfluxConfig] with the specified bucket.
    pub fn bucket(mut self, bucket: String) -> Self {
        self.bucket = bucket;
        self
    }

    /// Builds an [InfluxConfig] with the specified token.
    pub fn token(mut self, token: String) -> Self {
        self.token = token;
        self
    }

    /// Builds an [InfluxConfig] with the specified instance tag.
    pub fn instance_tag(mut self, instance_tag: String) -> Self {
        self.instance_tag = instance_tag;
        self
    }
}

/// Answers [TimeSeriesQuery]s from InfluxDB.
///
/// Each metric type is stored as its own measurement with a single `value` field, tagged with the
/// reporting instance. Buckets come back newest first, the same order Cloud Monitoring uses.
pub struct InfluxTelemetryClient {
    client: influxdb::Client,
    config: InfluxConfig,
}

impl InfluxTelemetryClient {
    pub fn new(config: InfluxConfig) -> Self {
        let client = influxdb::Client::new(config.host.clone(), config.bucket.clone())
            .with_token(config.token.clone());
        Self { client, config }
    }

    /// Render the InfluxQL statement for a query.
    pub fn build_query(&self, query: &TimeSeriesQuery) -> String {
        let select = match query.aligner {
            Aligner::Max => r#"MAX("value")"#,
            Aligner::Mean => r#"MEAN("value")"#,
            Aligner::Delta => r#"DIFFERENCE(LAST("value"))"#,
        };

        // DIFFERENCE has no value for the first bucket, so start one bucket early.
        let start_time_sec = match query.aligner {
            Aligner::Delta => query
                .start_time_sec
                .saturating_sub_unsigned(query.alignment_period_sec),
            Aligner::Max | Aligner::Mean => query.start_time_sec,
        };

        let mut statement = format!(
            "SELECT {select} AS value FROM {}.{}.{} WHERE {} = {} AND time >= {}s AND time < {}s",
            quote_identifier(&self.config.bucket),
            quote_identifier(&self.config.retention_policy),
            quote_identifier(&query.metric_type),
            quote_identifier(&self.config.instance_tag),
            quote_literal(&query.instance_id),
            start_time_sec,
            query.end_time_sec,
        );
        if let Some(filter) = &query.label_filter {
            statement.push_str(" AND ");
            statement.push_str(filter);
        }
        statement.push_str(&format!(
            " GROUP BY time({}s) ORDER BY time DESC",
            query.alignment_period_sec
        ));

        statement
    }

    async fn query(&self, query: &TimeSeriesQuery) -> Result<Vec<TimeSeries>, QueryError> {
        let q = ReadQuery::new(self.build_query(query));
        log::debug!("Querying: {:?}", q);

        let res = self
            .client
            .json_query(q)
            .await
            .map_err(|e| QueryError::Request {
                metric_type: query.metric_type.clone(),
                source: Box::new(e),
            })?;

        let Some(result) = res.results.first() else {
            return Err(QueryError::Response {
                metric_type: query.metric_type.clone(),
                reason: "No results in response".to_string(),
            });
        };

        let series = series_from_result(result, query)?;
        log::trace!("Loaded series: {:?}", series);

        Ok(series)
    }
}

impl TelemetryClient for InfluxTelemetryClient {
    fn list_time_series<'a>(
        &'a self,
        query: &'a TimeSeriesQuery,
    ) -> BoxFuture<'a, Result<Vec<TimeSeries>, QueryError>> {
        self.query(query).boxed()
    }
}

/// Convert one statement result from an InfluxDB JSON response into [TimeSeries].
///
/// A result without a `series` key matched nothing and yields an empty list. Buckets with a null
/// value or starting before the query window are dropped.
pub(crate) fn series_from_result(
    result: &Value,
    query: &TimeSeriesQuery,
) -> Result<Vec<TimeSeries>, QueryError> {
    let bad_response = |reason: String| QueryError::Response {
        metric_type: query.metric_type.clone(),
        reason,
    };

    if let Some(error) = result.get("error") {
        return Err(bad_response(format!("InfluxDB error: {error}")));
    }

    let Some(series) = result.get("series").and_then(|s| s.as_array()) else {
        log::debug!("No series in result for {}: {:?}", query.metric_type, result);
        return Ok(vec![]);
    };

    let mut out = Vec::with_capacity(series.len());
    for select_series in series {
        let columns = select_series
            .get("columns")
            .and_then(|c| c.as_array())
            .ok_or_else(|| bad_response(format!("No columns in series: {select_series:?}")))?;
        let time_idx = column_index(columns, "time")
            .ok_or_else(|| bad_response("No time column".to_string()))?;
        let value_idx = column_index(columns, "value")
            .ok_or_else(|| bad_response("No value column".to_string()))?;

        let values = select_series
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| bad_response(format!("No values in series: {select_series:?}")))?;

        let mut raw = Vec::with_capacity(values.len());
        for row in values {
            let row = row
                .as_array()
                .ok_or_else(|| bad_response(format!("Row is not an array: {row:?}")))?;
            let value = match row.get(value_idx) {
                None | Some(Value::Null) => continue,
                Some(Value::Number(n)) => n.clone(),
                Some(other) => return Err(bad_response(format!("Non-numeric value: {other}"))),
            };
            let start_time = row
                .get(time_idx)
                .and_then(parse_time)
                .ok_or_else(|| bad_response(format!("Bad time in row: {row:?}")))?;
            if start_time < query.start_time_sec {
                continue;
            }
            raw.push((start_time, value));
        }

        let all_integer = raw.iter().all(|(_, n)| n.is_i64());
        let value_type = if all_integer {
            VALUE_TYPE_INT64
        } else {
            VALUE_TYPE_DOUBLE
        };

        let period = query.alignment_period_sec as i64;
        let points = raw
            .into_iter()
            .map(|(start_time, n)| {
                let value = match n.as_i64() {
                    Some(i) if all_integer => TypedValue::int64(i),
                    _ => TypedValue::double(n.as_f64().unwrap_or(f64::NAN)),
                };
                Point {
                    value,
                    interval: TimeInterval {
                        start_time,
                        end_time: start_time + period,
                    },
                }
            })
            .collect();

        out.push(TimeSeries { value_type, points });
    }

    Ok(out)
}

fn quote_identifier(identifier: &str) -> String {
    format!(
        "\"{}\"",
        identifier.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

fn quote_literal(literal: &str) -> String {
    format!(
        "'{}'",
        literal.replace('\\', "\\\\").replace('\'', "\\'")
    )
}

fn column_index(columns: &[Value], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.as_str() == Some(name))
}

/// Times come back as RFC 3339 strings unless an epoch precision was requested.
fn parse_time(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp()),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
