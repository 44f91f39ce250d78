//! Grid spacing, extent and regularity of the latitude/longitude axes.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{adjacent_differences, all_close, Verdict};
use crate::dataset::DatasetHandle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Step between the first two samples of each axis, in axis units.
pub struct SpatialResolution {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialCoverage {
    pub latitude: Extent,
    pub longitude: Extent,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SpatialSummary {
    pub resolution: Option<SpatialResolution>,
    pub coverage: Option<SpatialCoverage>,
    pub consistency: Verdict,
}

/// Analyses the resolved latitude/longitude coordinates of a handle.
///
/// A handle without both axes yields an all-undefined summary.
pub fn analyze_spatial(handle: &DatasetHandle) -> SpatialSummary {
    let (lat, lon) = match (
        handle.latitude().and_then(|c| c.as_numeric()),
        handle.longitude().and_then(|c| c.as_numeric()),
    ) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            warn!(
                "No latitude/longitude coordinates in {}",
                handle.source().display()
            );
            return SpatialSummary::default();
        }
    };

    let resolution = SpatialResolution {
        latitude: axis_step(lat),
        longitude: axis_step(lon),
    };
    let coverage = match (extent(lat), extent(lon)) {
        (Some(latitude), Some(longitude)) => Some(SpatialCoverage {
            latitude,
            longitude,
        }),
        _ => None,
    };
    let consistency = match (is_regular(lat), is_regular(lon)) {
        (Some(a), Some(b)) => Verdict::from_bool(a && b),
        _ => Verdict::Undefined,
    };

    debug!(?resolution, ?coverage, "spatial axes");
    info!(
        "Spatial consistency of {}: {}",
        handle.source().display(),
        consistency
    );

    SpatialSummary {
        resolution: Some(resolution),
        coverage,
        consistency,
    }
}

fn axis_step(values: &[f64]) -> Option<f64> {
    match values {
        [first, second, ..] => Some((second - first).abs()),
        _ => None,
    }
}

fn extent(values: &[f64]) -> Option<Extent> {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<Extent>, &v| match acc {
            None => Some(Extent { min: v, max: v }),
            Some(e) => Some(Extent {
                min: e.min.min(v),
                max: e.max.max(v),
            }),
        })
}

/// Whether every step matches the first one; `None` below two samples.
fn is_regular(values: &[f64]) -> Option<bool> {
    let steps = adjacent_differences(values);
    let first = *steps.first()?;
    Some(all_close(&steps, first))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dataset::{AxisAliases, Coordinate, DatasetKind};

    #[test]
    fn should_measure_regular_grid() {
        let handle = grid(vec![10.0, 10.5, 11.0, 11.5], vec![-5.0, -4.5, -4.0]);

        let summary = analyze_spatial(&handle);

        let resolution = summary.resolution.unwrap();
        assert_eq!(resolution.latitude, Some(0.5));
        assert_eq!(resolution.longitude, Some(0.5));
        assert_eq!(summary.consistency, Verdict::Consistent);

        let coverage = summary.coverage.unwrap();
        assert_eq!(coverage.latitude, Extent { min: 10.0, max: 11.5 });
        assert_eq!(coverage.longitude, Extent { min: -5.0, max: -4.0 });
    }

    #[test]
    fn should_report_absolute_step_for_descending_axis() {
        let handle = grid(vec![90.0, 89.75, 89.5], vec![0.0, 0.25, 0.5]);

        let summary = analyze_spatial(&handle);

        assert_eq!(summary.resolution.unwrap().latitude, Some(0.25));
        assert_eq!(summary.consistency, Verdict::Consistent);
    }

    #[test]
    fn should_flag_irregular_axis() {
        let handle = grid(vec![0.0, 1.0, 3.0], vec![0.0, 1.0, 2.0]);

        assert_eq!(analyze_spatial(&handle).consistency, Verdict::Inconsistent);
    }

    #[test]
    fn should_be_undefined_for_single_sample_axis() {
        let handle = grid(vec![45.0], vec![0.0, 1.0]);

        let summary = analyze_spatial(&handle);

        assert_eq!(summary.resolution.unwrap().latitude, None);
        assert_eq!(summary.resolution.unwrap().longitude, Some(1.0));
        assert_eq!(summary.consistency, Verdict::Undefined);
    }

    #[test]
    fn should_be_undefined_without_spatial_axes() {
        let handle = DatasetHandle::new("station.nc", DatasetKind::Gridded)
            .with_coordinate("x", Coordinate::Numeric(vec![0.0, 1.0]))
            .resolve_axes(&AxisAliases::default());

        assert_eq!(analyze_spatial(&handle), SpatialSummary::default());
    }

    fn grid(lat: Vec<f64>, lon: Vec<f64>) -> DatasetHandle {
        DatasetHandle::new("grid.nc", DatasetKind::Gridded)
            .with_coordinate("lat", Coordinate::Numeric(lat))
            .with_coordinate("lon", Coordinate::Numeric(lon))
            .resolve_axes(&AxisAliases::default())
    }
}
