use crate::model::MetricPoint;
use perfmetrics_telemetry::{
    Point, TimeSeries, VALUE_TYPE_DISTRIBUTION, VALUE_TYPE_DOUBLE, VALUE_TYPE_INT64,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unhandled value type {0}")]
    UnsupportedValueType(i32),
    #[error("Point at {interval_start_sec} has no value for value type {value_type}")]
    MissingValue {
        value_type: i32,
        interval_start_sec: i64,
    },
    #[error("No values were retrieved for {metric_type}")]
    NoValues { metric_type: String },
}

/// Flatten a query response into [MetricPoint]s, oldest first.
///
/// The backend returns points newest first, so the flattened list is reversed once every series
/// has been read. Each value is divided by `factor` to bring it into reporting units.
pub fn parse_metric_points(
    metric_type: &str,
    response: &[TimeSeries],
    factor: f64,
) -> Result<Vec<MetricPoint>, ParseError> {
    let mut points = Vec::with_capacity(response.iter().map(|s| s.points.len()).sum());
    for series in response {
        for point in &series.points {
            let value = point_value(point, series.value_type)?;
            points.push(MetricPoint::new(
                value / factor,
                point.interval.start_time,
                point.interval.end_time,
            ));
        }
    }

    if points.is_empty() {
        return Err(ParseError::NoValues {
            metric_type: metric_type.to_string(),
        });
    }

    points.reverse();
    Ok(points)
}

fn point_value(point: &Point, value_type: i32) -> Result<f64, ParseError> {
    let value = match value_type {
        VALUE_TYPE_DOUBLE => point.value.double_value,
        VALUE_TYPE_INT64 => point.value.int64_value.map(|v| v as f64),
        VALUE_TYPE_DISTRIBUTION => point.value.distribution_value.as_ref().map(|d| d.mean),
        other => return Err(ParseError::UnsupportedValueType(other)),
    };

    value.ok_or(ParseError::MissingValue {
        value_type,
        interval_start_sec: point.interval.start_time,
    })
}
