use crate::model::{CorrelatedRow, MetricPoint};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelateError {
    #[error("No streams to correlate")]
    NoStreams,
    #[error("Stream '{stream}' has {found} points but '{reference}' has {expected}")]
    StreamLengthMismatch {
        reference: String,
        stream: String,
        expected: usize,
        found: usize,
    },
    #[error("Stream '{stream}' point {index} starts at {found}, expected {expected}")]
    IntervalMisaligned {
        stream: String,
        index: usize,
        expected: i64,
        found: i64,
    },
}

/// A parsed stream and the name it is reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedStream {
    pub name: String,
    pub points: Vec<MetricPoint>,
}

impl NamedStream {
    pub fn new(name: impl Into<String>, points: Vec<MetricPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Zip streams into one row per interval, with one value per stream in the given order.
///
/// Every stream must cover the same intervals. A stream with a different number of points, or a
/// point that starts at a different time than the first stream's point at the same index, is an
/// error rather than being truncated.
pub fn correlate_streams(streams: &[NamedStream]) -> Result<Vec<CorrelatedRow>, CorrelateError> {
    let Some(reference) = streams.first() else {
        return Err(CorrelateError::NoStreams);
    };

    if let Some(stream) = streams
        .iter()
        .find(|s| s.points.len() != reference.points.len())
    {
        return Err(CorrelateError::StreamLengthMismatch {
            reference: reference.name.clone(),
            stream: stream.name.clone(),
            expected: reference.points.len(),
            found: stream.points.len(),
        });
    }

    reference
        .points
        .iter()
        .enumerate()
        .map(|(index, anchor)| {
            let values = streams
                .iter()
                .map(|stream| {
                    let point = &stream.points[index];
                    if point.interval_start_sec != anchor.interval_start_sec {
                        return Err(CorrelateError::IntervalMisaligned {
                            stream: stream.name.clone(),
                            index,
                            expected: anchor.interval_start_sec,
                            found: point.interval_start_sec,
                        });
                    }
                    Ok(point.value)
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(CorrelatedRow {
                interval_start_sec: anchor.interval_start_sec,
                values,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stream(name: &str, values: &[(i64, f64)]) -> NamedStream {
        NamedStream::new(
            name,
            values
                .iter()
                .map(|(start, value)| MetricPoint::new(*value, *start, start + 120))
                .collect(),
        )
    }

    #[test]
    fn zip_two_streams() {
        let peak = stream("peak", &[(100, 8.5), (220, 8.4), (340, 8.6)]);
        let mean = stream("mean", &[(100, 8.3), (220, 8.2), (340, 8.5)]);

        let rows = correlate_streams(&[peak, mean]).unwrap();

        assert_eq!(
            rows,
            vec![
                CorrelatedRow {
                    interval_start_sec: 100,
                    values: vec![8.5, 8.3],
                },
                CorrelatedRow {
                    interval_start_sec: 220,
                    values: vec![8.4, 8.2],
                },
                CorrelatedRow {
                    interval_start_sec: 340,
                    values: vec![8.6, 8.5],
                },
            ]
        );
    }

    #[test]
    fn single_stream() {
        let rows = correlate_streams(&[stream("only", &[(100, 1.0)])]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values, vec![1.0]);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let peak = stream("peak", &[(100, 8.5), (220, 8.4), (340, 8.6)]);
        let mean = stream("mean", &[(100, 8.3), (220, 8.2)]);

        assert_eq!(
            correlate_streams(&[peak, mean]),
            Err(CorrelateError::StreamLengthMismatch {
                reference: "peak".to_string(),
                stream: "mean".to_string(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn misaligned_intervals_are_an_error() {
        let peak = stream("peak", &[(100, 8.5), (220, 8.4)]);
        let mean = stream("mean", &[(100, 8.3), (230, 8.2)]);

        assert_eq!(
            correlate_streams(&[peak, mean]),
            Err(CorrelateError::IntervalMisaligned {
                stream: "mean".to_string(),
                index: 1,
                expected: 220,
                found: 230,
            })
        );
    }

    #[test]
    fn no_streams_is_an_error() {
        assert_eq!(correlate_streams(&[]), Err(CorrelateError::NoStreams));
    }
}
