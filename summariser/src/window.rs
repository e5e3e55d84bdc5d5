use crate::unit::{convert_value, UnitError, DEFAULT_RAMP_TIME_UNIT, RAMP_TIME_MS};
use serde::{Deserialize, Serialize};

/// Wall-clock bounds of a job, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobWindow {
    pub start_time_sec: i64,
    pub end_time_sec: i64,
}

impl JobWindow {
    /// A window that starts and ends in the same second cannot be queried for metrics.
    pub fn is_degenerate(&self) -> bool {
        self.start_time_sec == self.end_time_sec
    }

    /// Checks that the window starts before it ends.
    pub fn validate(&self) -> Result<(), InvalidWindow> {
        if self.start_time_sec < self.end_time_sec {
            Ok(())
        } else {
            Err(InvalidWindow {
                start_time_sec: self.start_time_sec,
                end_time_sec: self.end_time_sec,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Start time {start_time_sec} should be before end time {end_time_sec}")]
pub struct InvalidWindow {
    pub start_time_sec: i64,
    pub end_time_sec: i64,
}

/// A ramp time that is not a valid duration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid ramp time in {}: {error}", owner(.job))]
pub struct RampTimeError {
    /// The job the ramp time belongs to, `None` for the global options
    pub job: Option<usize>,
    pub error: UnitError,
}

fn owner(job: &Option<usize>) -> String {
    match job {
        Some(index) => format!("job {index}"),
        None => "global options".to_string(),
    }
}

/// The timing inputs of a single job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobTiming<'a> {
    /// Measured runtime, excluding ramp time
    pub runtime_ms: i64,
    /// The job's own `ramp_time` option, if set
    pub ramp_time: Option<&'a str>,
}

/// Reconstruct the wall-clock window of every job in a trace.
///
/// fio only records when the run finished, so windows are built backwards from
/// `aggregate_timestamp_ms`: the last job ends at that timestamp and every earlier job ends when
/// the job after it started. A job's start is its end minus its runtime and ramp time. A job
/// without its own non-zero ramp time uses `global_ramp_time`.
///
/// Exactly one window is returned per job, in job order. Degenerate windows are kept, deciding
/// what to do with them is up to the caller.
pub fn reconstruct_windows(
    aggregate_timestamp_ms: i64,
    global_ramp_time: Option<&str>,
    jobs: &[JobTiming<'_>],
) -> Result<Vec<JobWindow>, RampTimeError> {
    let global_ramp_ms = match global_ramp_time {
        Some(ramp_time) => convert_ramp_time(ramp_time)
            .map_err(|error| RampTimeError { job: None, error })?,
        None => 0.0,
    };

    let chain = jobs.iter().enumerate().rev().try_fold(
        Chain::new(aggregate_timestamp_ms, jobs.len()),
        |chain, (index, job)| {
            chain
                .step(job, global_ramp_ms)
                .map_err(|error| RampTimeError {
                    job: Some(index),
                    error,
                })
        },
    )?;

    let mut windows = chain.windows;
    windows.reverse();
    Ok(windows)
}

/// Accumulator for the backwards walk over the jobs.
struct Chain {
    aggregate_timestamp_ms: i64,
    /// Start of the job after the one being processed, in whole seconds
    next_start_sec: Option<i64>,
    /// Windows in reverse job order
    windows: Vec<JobWindow>,
}

impl Chain {
    fn new(aggregate_timestamp_ms: i64, capacity: usize) -> Self {
        Self {
            aggregate_timestamp_ms,
            next_start_sec: None,
            windows: Vec::with_capacity(capacity),
        }
    }

    fn step(mut self, job: &JobTiming<'_>, global_ramp_ms: f64) -> Result<Self, UnitError> {
        // Chaining through whole seconds keeps each job's end equal to the next job's start.
        let end_ms = match self.next_start_sec {
            Some(next_start_sec) => next_start_sec as f64 * 1000.0,
            None => self.aggregate_timestamp_ms as f64,
        };
        let ramp_ms = resolve_ramp_ms(job.ramp_time, global_ramp_ms)?;
        let start_ms = end_ms - job.runtime_ms as f64 - ramp_ms;

        let window = JobWindow {
            start_time_sec: (start_ms / 1000.0).floor() as i64,
            end_time_sec: (end_ms / 1000.0).round_ties_even() as i64,
        };

        self.next_start_sec = Some(window.start_time_sec);
        self.windows.push(window);
        Ok(self)
    }
}

fn resolve_ramp_ms(ramp_time: Option<&str>, global_ramp_ms: f64) -> Result<f64, UnitError> {
    let job_ramp_ms = match ramp_time {
        Some(ramp_time) => convert_ramp_time(ramp_time)?,
        None => 0.0,
    };

    Ok(if job_ramp_ms != 0.0 {
        job_ramp_ms
    } else {
        global_ramp_ms
    })
}

fn convert_ramp_time(ramp_time: &str) -> Result<f64, UnitError> {
    convert_value(ramp_time, RAMP_TIME_MS, DEFAULT_RAMP_TIME_UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const T_MS: i64 = 1653027155372;

    fn timing(runtime_ms: i64) -> JobTiming<'static> {
        JobTiming {
            runtime_ms,
            ramp_time: None,
        }
    }

    #[test]
    fn single_job() {
        let windows = reconstruct_windows(T_MS, None, &[timing(60476)]).unwrap();

        assert_eq!(
            windows,
            vec![JobWindow {
                start_time_sec: (T_MS - 60476).div_euclid(1000),
                end_time_sec: 1653027155,
            }]
        );
    }

    #[test]
    fn chained_jobs_share_boundaries() {
        let windows = reconstruct_windows(T_MS, None, &[timing(60000), timing(30000)]).unwrap();

        let job2_start = (T_MS - 30000).div_euclid(1000);
        assert_eq!(
            windows,
            vec![
                JobWindow {
                    start_time_sec: job2_start - 60,
                    end_time_sec: job2_start,
                },
                JobWindow {
                    start_time_sec: job2_start,
                    end_time_sec: 1653027155,
                },
            ]
        );
    }

    #[test]
    fn global_ramp_time_applies_to_every_job() {
        let windows =
            reconstruct_windows(T_MS, Some("10s"), &[timing(60000), timing(30000)]).unwrap();

        let job2_start = (T_MS - 30000 - 10000).div_euclid(1000);
        assert_eq!(windows[1].start_time_sec, job2_start);
        assert_eq!(windows[0].end_time_sec, job2_start);
        assert_eq!(windows[0].start_time_sec, job2_start - 70);
    }

    #[test]
    fn job_ramp_time_overrides_global() {
        let jobs = [JobTiming {
            runtime_ms: 60000,
            ramp_time: Some("2m"),
        }];
        let windows = reconstruct_windows(T_MS, Some("10s"), &jobs).unwrap();

        assert_eq!(
            windows[0].start_time_sec,
            (T_MS - 60000 - 120_000).div_euclid(1000)
        );
    }

    #[test]
    fn zero_job_ramp_time_falls_back_to_global() {
        let jobs = [JobTiming {
            runtime_ms: 60000,
            ramp_time: Some("0"),
        }];
        let windows = reconstruct_windows(T_MS, Some("10"), &jobs).unwrap();

        assert_eq!(
            windows[0].start_time_sec,
            (T_MS - 60000 - 10_000).div_euclid(1000)
        );
    }

    #[test]
    fn degenerate_window_is_kept() {
        let windows =
            reconstruct_windows(1653027155000, None, &[timing(0), timing(60000)]).unwrap();

        assert_eq!(windows.len(), 2);
        assert!(!windows[1].is_degenerate());
        assert!(windows[0].is_degenerate());
        assert_eq!(windows[0].start_time_sec, 1653027095);
    }

    #[test]
    fn end_time_rounds_half_to_even() {
        let windows = reconstruct_windows(2500, None, &[timing(1000)]).unwrap();
        assert_eq!(windows[0].end_time_sec, 2);

        let windows = reconstruct_windows(3500, None, &[timing(1000)]).unwrap();
        assert_eq!(windows[0].end_time_sec, 4);
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let jobs = [
            timing(60000),
            JobTiming {
                runtime_ms: 45123,
                ramp_time: Some("1500ms"),
            },
            timing(30000),
        ];

        let first = reconstruct_windows(T_MS, Some("5s"), &jobs).unwrap();
        let second = reconstruct_windows(T_MS, Some("5s"), &jobs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn no_jobs_no_windows() {
        assert!(reconstruct_windows(T_MS, None, &[]).unwrap().is_empty());
    }

    #[test]
    fn bad_ramp_time_is_an_error() {
        let jobs = [JobTiming {
            runtime_ms: 60000,
            ramp_time: Some("10 fortnights"),
        }];
        assert!(matches!(
            reconstruct_windows(T_MS, None, &jobs),
            Err(RampTimeError {
                job: Some(0),
                error: UnitError::MalformedValue { .. }
            })
        ));

        let err = reconstruct_windows(T_MS, Some("10y"), &[timing(1000)]).unwrap_err();
        assert!(matches!(
            err,
            RampTimeError {
                job: None,
                error: UnitError::UnknownUnit { .. }
            }
        ));
        assert_eq!(
            err.to_string(),
            "Invalid ramp time in global options: Unknown unit 'y' in value '10y'"
        );
    }

    #[test]
    fn bad_ramp_time_names_its_job() {
        let jobs = [
            timing(60000),
            JobTiming {
                runtime_ms: 30000,
                ramp_time: Some("5 minutes"),
            },
            timing(1000),
        ];

        let err = reconstruct_windows(T_MS, None, &jobs).unwrap_err();
        assert_eq!(err.job, Some(1));
        assert!(err.to_string().starts_with("Invalid ramp time in job 1: "));
    }

    #[test]
    fn huge_negative_runtime_does_not_overflow() {
        let jobs = [timing(1000), timing(-9223372036854775807)];
        let windows = reconstruct_windows(T_MS, None, &jobs).unwrap();

        assert_eq!(windows.len(), 2);
        assert!(windows[1].start_time_sec > windows[1].end_time_sec);
    }

    #[test]
    fn validate_window() {
        let window = JobWindow {
            start_time_sec: 10,
            end_time_sec: 20,
        };
        assert!(window.validate().is_ok());

        let window = JobWindow {
            start_time_sec: 20,
            end_time_sec: 20,
        };
        assert_eq!(
            window.validate(),
            Err(InvalidWindow {
                start_time_sec: 20,
                end_time_sec: 20,
            })
        );
    }
}
