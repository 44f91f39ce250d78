//! Time step, span and regularity of the time coordinate.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Verdict;
use crate::dataset::DatasetHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
/// How the temporal resolution is derived from the time steps.
pub enum ResolutionPolicy {
    /// The step between the first two samples.
    #[default]
    FirstDifference,
    /// The mean step, truncated to whole hours.
    MeanDifference,
}

impl std::fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionPolicy::FirstDifference => f.write_str("first-difference"),
            ResolutionPolicy::MeanDifference => f.write_str("mean-difference"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemporalCoverage {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TemporalSummary {
    /// Whole hours between samples.
    pub resolution_hours: Option<i64>,
    pub coverage: Option<TemporalCoverage>,
    pub consistency: Verdict,
    pub policy: ResolutionPolicy,
}

pub fn analyze_temporal(handle: &DatasetHandle, policy: ResolutionPolicy) -> TemporalSummary {
    let times = match handle.time() {
        Some(coordinate) => match coordinate.as_temporal() {
            Some(times) => times,
            None => {
                warn!(
                    "Time coordinate of {} is not decoded as timestamps",
                    handle.source().display()
                );
                return TemporalSummary {
                    policy,
                    ..Default::default()
                };
            }
        },
        None => {
            warn!("No time coordinate in {}", handle.source().display());
            return TemporalSummary {
                policy,
                ..Default::default()
            };
        }
    };

    let steps = hour_steps(times);
    let resolution_hours = resolution(&steps, policy);
    let coverage = match (times.iter().min(), times.iter().max()) {
        (Some(&start), Some(&end)) => Some(TemporalCoverage { start, end }),
        _ => None,
    };
    let consistency = match steps.first() {
        Some(first) => Verdict::from_bool(steps.iter().all(|s| s == first)),
        None => Verdict::Undefined,
    };

    info!(
        "Temporal consistency of {}: {}",
        handle.source().display(),
        consistency
    );

    TemporalSummary {
        resolution_hours,
        coverage,
        consistency,
        policy,
    }
}

/// Neighbouring differences, each truncated to whole hours.
pub fn hour_steps(times: &[NaiveDateTime]) -> Vec<i64> {
    times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_hours())
        .collect()
}

pub fn resolution(steps: &[i64], policy: ResolutionPolicy) -> Option<i64> {
    match policy {
        ResolutionPolicy::FirstDifference => steps.first().copied(),
        ResolutionPolicy::MeanDifference if steps.is_empty() => None,
        ResolutionPolicy::MeanDifference => {
            let mean = steps.iter().sum::<i64>() as f64 / steps.len() as f64;
            Some(mean.trunc() as i64)
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::dataset::{AxisAliases, Coordinate, DatasetKind};

    #[test]
    fn should_detect_gap_in_hourly_series() {
        let handle = series(&[0, 1, 2, 4]);

        let summary = analyze_temporal(&handle, ResolutionPolicy::FirstDifference);

        assert_eq!(summary.resolution_hours, Some(1));
        assert_eq!(summary.consistency, Verdict::Inconsistent);
        let coverage = summary.coverage.unwrap();
        assert_eq!(coverage.start, hour(0));
        assert_eq!(coverage.end, hour(4));
    }

    #[test]
    fn should_accept_regular_daily_series() {
        let handle = series(&[0, 24, 48, 72]);

        let summary = analyze_temporal(&handle, ResolutionPolicy::FirstDifference);

        assert_eq!(summary.resolution_hours, Some(24));
        assert_eq!(summary.consistency, Verdict::Consistent);
    }

    #[test]
    fn should_truncate_mean_step() {
        let handle = series(&[0, 1, 2, 4]);

        let summary = analyze_temporal(&handle, ResolutionPolicy::MeanDifference);

        // steps 1, 1, 2 -> mean 1.33
        assert_eq!(summary.resolution_hours, Some(1));
        assert_eq!(summary.policy, ResolutionPolicy::MeanDifference);
        assert_eq!(resolution(&[6, 6, 7, 7], ResolutionPolicy::MeanDifference), Some(6));
    }

    #[test]
    fn should_be_undefined_for_single_timestamp() {
        let handle = series(&[0]);

        let summary = analyze_temporal(&handle, ResolutionPolicy::FirstDifference);

        assert_eq!(summary.resolution_hours, None);
        assert_eq!(summary.consistency, Verdict::Undefined);
        assert_eq!(summary.coverage.unwrap().start, hour(0));
    }

    #[test]
    fn should_be_undefined_without_time() {
        let handle = DatasetHandle::new("static.nc", DatasetKind::Gridded)
            .resolve_axes(&AxisAliases::default());

        let summary = analyze_temporal(&handle, ResolutionPolicy::MeanDifference);

        assert_eq!(summary.resolution_hours, None);
        assert_eq!(summary.coverage, None);
        assert_eq!(summary.consistency, Verdict::Undefined);
    }

    fn series(hours: &[i64]) -> DatasetHandle {
        let times = hours.iter().map(|h| hour(*h)).collect();
        DatasetHandle::new("series.nc", DatasetKind::Gridded)
            .with_coordinate("time", Coordinate::Temporal(times))
            .resolve_axes(&AxisAliases::default())
    }

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }
}
