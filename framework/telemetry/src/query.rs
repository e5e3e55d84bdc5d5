use serde::{Deserialize, Serialize};
use std::fmt;

/// The reduction the backend applies to raw samples within each alignment period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aligner {
    /// Keep the largest sample in the period
    #[serde(rename = "ALIGN_MAX")]
    Max,
    /// Average the samples in the period
    #[serde(rename = "ALIGN_MEAN")]
    Mean,
    /// Change of a cumulative counter over the period
    #[serde(rename = "ALIGN_DELTA")]
    Delta,
}

impl fmt::Display for Aligner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aligner::Max => write!(f, "ALIGN_MAX"),
            Aligner::Mean => write!(f, "ALIGN_MEAN"),
            Aligner::Delta => write!(f, "ALIGN_DELTA"),
        }
    }
}

/// A request for one metric on one instance, reduced into fixed-width buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesQuery {
    /// Fully qualified metric type, e.g. `compute.googleapis.com/instance/cpu/utilization`
    pub metric_type: String,
    /// Inclusive start of the query window, Unix seconds
    pub start_time_sec: i64,
    /// Exclusive end of the query window, Unix seconds
    pub end_time_sec: i64,
    /// The instance the metric was reported by
    pub instance_id: String,
    /// Bucket width in seconds
    pub alignment_period_sec: u64,
    pub aligner: Aligner,
    /// Additional backend-specific condition, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_filter: Option<String>,
}

impl TimeSeriesQuery {
    pub fn new(
        metric_type: impl Into<String>,
        start_time_sec: i64,
        end_time_sec: i64,
        instance_id: impl Into<String>,
        alignment_period_sec: u64,
        aligner: Aligner,
    ) -> Self {
        Self {
            metric_type: metric_type.into(),
            start_time_sec,
            end_time_sec,
            instance_id: instance_id.into(),
            alignment_period_sec,
            aligner,
            label_filter: None,
        }
    }

    /// Builds a [TimeSeriesQuery] with the specified label filter.
    pub fn label_filter(mut self, label_filter: Option<String>) -> Self {
        self.label_filter = label_filter;
        self
    }
}
