use serde::{Deserialize, Serialize};

/// Value type code for series whose points carry [TypedValue::int64_value].
pub const VALUE_TYPE_INT64: i32 = 2;
/// Value type code for series whose points carry [TypedValue::double_value].
pub const VALUE_TYPE_DOUBLE: i32 = 3;
/// Value type code for series whose points carry [TypedValue::distribution_value].
pub const VALUE_TYPE_DISTRIBUTION: i32 = 5;

/// One series in a query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Discriminator naming which field of [TypedValue] is populated on each point.
    ///
    /// Kept as the raw code so that a consumer can reject encodings it does not understand.
    pub value_type: i32,
    /// Points as the backend ordered them, usually newest first
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub value: TypedValue,
    pub interval: TimeInterval,
}

/// A point value. Exactly one field is expected to be set, matching the series' value type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int64_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_value: Option<Distribution>,
}

impl TypedValue {
    pub fn double(value: f64) -> Self {
        Self {
            double_value: Some(value),
            ..Default::default()
        }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            int64_value: Some(value),
            ..Default::default()
        }
    }

    pub fn distribution(count: i64, mean: f64) -> Self {
        Self {
            distribution_value: Some(Distribution { count, mean }),
            ..Default::default()
        }
    }
}

/// Summary of a histogram-valued point. Only the mean is consumed downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(default)]
    pub count: i64,
    pub mean: f64,
}

/// The bucket a point was reduced over, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start_time: i64,
    pub end_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_series_from_fixture_shape() {
        let series: TimeSeries = serde_json::from_str(
            r#"{
                "value_type": 5,
                "points": [
                    {
                        "value": { "distribution_value": { "count": 12, "mean": 3.5 } },
                        "interval": { "start_time": 1652699280, "end_time": 1652699400 }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(series.value_type, VALUE_TYPE_DISTRIBUTION);
        assert_eq!(series.points[0].value, TypedValue::distribution(12, 3.5));
        assert_eq!(series.points[0].interval.end_time, 1652699400);
    }
}
