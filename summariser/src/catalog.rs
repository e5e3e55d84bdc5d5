use itertools::Itertools;
use perfmetrics_telemetry::Aligner;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One metric stream fetched for every job window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Column name of the stream in the metrics worksheet
    pub name: String,
    pub metric_type: String,
    pub aligner: Aligner,
    /// Every fetched value is divided by this
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_filter: Option<String>,
}

fn default_factor() -> f64 {
    1.0
}

impl StreamSpec {
    pub fn new(
        name: impl Into<String>,
        metric_type: impl Into<String>,
        aligner: Aligner,
        factor: f64,
    ) -> Self {
        Self {
            name: name.into(),
            metric_type: metric_type.into(),
            aligner,
            factor,
            label_filter: None,
        }
    }
}

const CPU_UTILIZATION: &str = "compute.googleapis.com/instance/cpu/utilization";
const RECEIVED_BYTES: &str = "compute.googleapis.com/instance/network/received_bytes_count";
const OPS_ERROR_COUNT: &str = "custom.googleapis.com/gcsfuse/fs/ops_error_count";
const OPS_LATENCY: &str = "custom.googleapis.com/gcsfuse/fs/ops_latency";
const READ_BYTES_COUNT: &str = "custom.googleapis.com/gcsfuse/gcs/read_bytes_count";

/// The streams reported when no catalog file is given, in column order.
///
/// CPU utilization is reported as a fraction, so it is scaled to a percentage. Received bytes are
/// summed per minute and scaled to bytes per second in thousands.
pub fn default_streams() -> Vec<StreamSpec> {
    vec![
        StreamSpec::new("cpu_utilization_peak", CPU_UTILIZATION, Aligner::Max, 0.01),
        StreamSpec::new("cpu_utilization_mean", CPU_UTILIZATION, Aligner::Mean, 0.01),
        StreamSpec::new("received_bytes_peak", RECEIVED_BYTES, Aligner::Max, 60000.0),
        StreamSpec::new("received_bytes_mean", RECEIVED_BYTES, Aligner::Mean, 60000.0),
        StreamSpec::new("ops_error_count", OPS_ERROR_COUNT, Aligner::Delta, 1.0),
        StreamSpec::new("ops_latency_mean", OPS_LATENCY, Aligner::Mean, 1.0),
        StreamSpec::new("read_bytes_count", READ_BYTES_COUNT, Aligner::Delta, 1.0),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read stream catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse stream catalog: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Stream catalog has no streams")]
    Empty,
    #[error("Stream '{name}' has invalid factor {factor}")]
    InvalidFactor { name: String, factor: f64 },
    #[error("Stream name '{0}' is used more than once")]
    DuplicateName(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    streams: Vec<StreamSpec>,
}

/// Parse a stream catalog from TOML with one `[[streams]]` table per stream.
pub fn parse_catalog(input: &str) -> Result<Vec<StreamSpec>, CatalogError> {
    let catalog: CatalogFile = toml::from_str(input)?;
    validate_streams(&catalog.streams)?;
    Ok(catalog.streams)
}

/// Load a stream catalog from a TOML file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<StreamSpec>, CatalogError> {
    let path = path.as_ref();
    log::debug!("Loading stream catalog from {}", path.display());
    let input = std::fs::read_to_string(path)?;
    parse_catalog(&input)
}

/// Checks that a catalog can produce a correlated row.
pub fn validate_streams(streams: &[StreamSpec]) -> Result<(), CatalogError> {
    if streams.is_empty() {
        return Err(CatalogError::Empty);
    }

    if let Some(stream) = streams
        .iter()
        .find(|s| !s.factor.is_finite() || s.factor == 0.0)
    {
        return Err(CatalogError::InvalidFactor {
            name: stream.name.clone(),
            factor: stream.factor,
        });
    }

    if let Some(name) = streams.iter().map(|s| s.name.as_str()).duplicates().next() {
        return Err(CatalogError::DuplicateName(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_catalog_is_valid() {
        let streams = default_streams();
        validate_streams(&streams).unwrap();

        let names = streams.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "cpu_utilization_peak",
                "cpu_utilization_mean",
                "received_bytes_peak",
                "received_bytes_mean",
                "ops_error_count",
                "ops_latency_mean",
                "read_bytes_count",
            ]
        );
        assert_eq!(streams[0].factor, 0.01);
        assert_eq!(streams[2].factor, 60000.0);
        assert_eq!(streams[4].aligner, Aligner::Delta);
    }

    #[test]
    fn parse_toml_catalog() {
        let streams = parse_catalog(
            r#"
[[streams]]
name = "cpu_peak"
metric_type = "compute.googleapis.com/instance/cpu/utilization"
aligner = "ALIGN_MAX"
factor = 0.01

[[streams]]
name = "errors"
metric_type = "custom.googleapis.com/gcsfuse/fs/ops_error_count"
aligner = "ALIGN_DELTA"
label_filter = "\"fs_op\" = 'ReadFile'"
"#,
        )
        .unwrap();

        assert_eq!(
            streams,
            vec![
                StreamSpec::new("cpu_peak", CPU_UTILIZATION, Aligner::Max, 0.01),
                StreamSpec {
                    label_filter: Some(r#""fs_op" = 'ReadFile'"#.to_string()),
                    ..StreamSpec::new("errors", OPS_ERROR_COUNT, Aligner::Delta, 1.0)
                },
            ]
        );
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(parse_catalog(""), Err(CatalogError::Empty)));
    }

    #[test]
    fn zero_factor_is_rejected() {
        let result = parse_catalog(
            r#"
[[streams]]
name = "cpu"
metric_type = "cpu"
aligner = "ALIGN_MEAN"
factor = 0.0
"#,
        );

        assert!(matches!(
            result,
            Err(CatalogError::InvalidFactor { name, .. }) if name == "cpu"
        ));
    }

    #[test]
    fn infinite_factor_is_rejected() {
        let streams = vec![StreamSpec::new("cpu", "cpu", Aligner::Mean, f64::INFINITY)];
        assert!(matches!(
            validate_streams(&streams),
            Err(CatalogError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let streams = vec![
            StreamSpec::new("cpu", "cpu", Aligner::Mean, 1.0),
            StreamSpec::new("cpu", "cpu", Aligner::Max, 1.0),
        ];
        assert!(matches!(
            validate_streams(&streams),
            Err(CatalogError::DuplicateName(name)) if name == "cpu"
        ));
    }

    #[test]
    fn unknown_aligner_is_a_parse_error() {
        let result = parse_catalog(
            r#"
[[streams]]
name = "cpu"
metric_type = "cpu"
aligner = "ALIGN_SUM"
"#,
        );
        assert!(matches!(result, Err(CatalogError::Toml(_))));
    }

    #[test]
    fn load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[[streams]]\nname = \"cpu\"\nmetric_type = \"cpu\"\naligner = \"ALIGN_MEAN\"\n",
        )
        .unwrap();

        let streams = load_catalog(file.path()).unwrap();
        assert_eq!(streams, vec![StreamSpec::new("cpu", "cpu", Aligner::Mean, 1.0)]);
    }
}
