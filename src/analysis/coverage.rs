//! Checks against an expected region and an expected period.

use std::{collections::BTreeSet, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    dataset::{DatasetHandle, DatasetKind, Values},
    error::ConfigError,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon
    }

    /// Minimums do not exceed maximums.
    pub fn is_ordered(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// Parses `MIN_LAT,MAX_LAT,MIN_LON,MAX_LON`.
impl FromStr for BoundingBox {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidExpectation(s.to_string());
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [min_lat, max_lat, min_lon, max_lon] => Some(BoundingBox {
                min_lat: *min_lat,
                max_lat: *max_lat,
                min_lon: *min_lon,
                max_lon: *max_lon,
            })
            .filter(BoundingBox::is_ordered)
            .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive range of calendar days.
pub struct DatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatePeriod {
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

impl std::fmt::Display for DatePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

/// Parses `START,END` as `YYYY-MM-DD` dates.
impl FromStr for DatePeriod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidExpectation(s.to_string());
        let (start, end) = s.split_once(',').ok_or_else(invalid)?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        Some(DatePeriod { start, end })
            .filter(DatePeriod::is_ordered)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundsCheck {
    pub expected: BoundingBox,
    /// Points (grid cells or rows) with a position outside the expected box.
    pub out_of_range: usize,
    pub all_within: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCoverage {
    pub expected: DatePeriod,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub missing_dates: Vec<NaiveDate>,
}

/// Counts points outside `expected`. `None` when the handle has no positions.
///
/// Gridded points are the cells of the latitude/longitude grid; tabular
/// points are rows, where a null position counts as outside.
pub fn check_spatial_bounds(handle: &DatasetHandle, expected: BoundingBox) -> Option<BoundsCheck> {
    let lat_name = handle.axes().latitude.as_deref()?;
    let lon_name = handle.axes().longitude.as_deref()?;

    let out_of_range = match handle.kind() {
        DatasetKind::Gridded => {
            let lat = handle.coordinate(lat_name)?.as_numeric()?;
            let lon = handle.coordinate(lon_name)?.as_numeric()?;
            let inside_lat = lat.iter().filter(|v| expected.contains_lat(**v)).count();
            let inside_lon = lon.iter().filter(|v| expected.contains_lon(**v)).count();
            lat.len() * lon.len() - inside_lat * inside_lon
        }
        DatasetKind::Tabular => {
            let lat = handle.variable(lat_name)?.numeric_values()?;
            let lon = handle.variable(lon_name)?.numeric_values()?;
            lat.iter()
                .zip(lon.iter())
                .filter(|(la, lo)| !(expected.contains_lat(**la) && expected.contains_lon(**lo)))
                .count()
        }
    };

    if out_of_range > 0 {
        warn!(
            "{} points of {} fall outside the expected region",
            out_of_range,
            handle.source().display()
        );
    }

    Some(BoundsCheck {
        expected,
        out_of_range,
        all_within: out_of_range == 0,
    })
}

/// Lists days of `expected` with no sample. `None` when the handle has no
/// readable time axis.
///
/// Gridded handles use the time coordinate; tabular handles use the named
/// time column and skip entries that are not timestamps.
pub fn check_date_coverage(
    handle: &DatasetHandle,
    time_column: &str,
    expected: DatePeriod,
) -> Option<DateCoverage> {
    let dates: BTreeSet<NaiveDate> = match handle.kind() {
        DatasetKind::Gridded => handle
            .time()?
            .as_temporal()?
            .iter()
            .map(|t| t.date())
            .collect(),
        DatasetKind::Tabular => match &handle.variable(time_column)?.values {
            Values::Cells(cells) => cells
                .iter()
                .filter_map(|c| c.as_datetime())
                .map(|t| t.date())
                .collect(),
            Values::Numeric(_) => return None,
        },
    };

    let missing_dates: Vec<NaiveDate> = expected
        .start
        .iter_days()
        .take_while(|d| *d <= expected.end)
        .filter(|d| !dates.contains(d))
        .collect();

    info!(
        "{} days of the expected period missing from {}",
        missing_dates.len(),
        handle.source().display()
    );

    Some(DateCoverage {
        expected,
        actual_start: dates.first().copied(),
        actual_end: dates.last().copied(),
        missing_dates,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dataset::{AxisAliases, Cell, Coordinate, Variable};

    #[test]
    fn should_parse_bounding_box() {
        let bbox: BoundingBox = "10, 20, -5, 5".parse().unwrap();

        assert_eq!(
            bbox,
            BoundingBox {
                min_lat: 10.0,
                max_lat: 20.0,
                min_lon: -5.0,
                max_lon: 5.0
            }
        );
        assert!("10,20,-5".parse::<BoundingBox>().is_err());
        assert!("20,10,-5,5".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn should_parse_date_period() {
        let period: DatePeriod = "2020-01-01,2020-12-31".parse().unwrap();

        assert_eq!(period.start, date(2020, 1, 1));
        assert_eq!(period.end, date(2020, 12, 31));
        assert!("2020-12-31,2020-01-01".parse::<DatePeriod>().is_err());
        assert!("2020-01-01".parse::<DatePeriod>().is_err());
    }

    #[test]
    fn should_count_grid_cells_outside_region() {
        let handle = DatasetHandle::new("grid.nc", DatasetKind::Gridded)
            .with_coordinate("lat", Coordinate::Numeric(vec![0.0, 10.0, 20.0]))
            .with_coordinate("lon", Coordinate::Numeric(vec![0.0, 5.0]))
            .resolve_axes(&AxisAliases::default());
        let expected: BoundingBox = "0,10,0,10".parse().unwrap();

        let check = check_spatial_bounds(&handle, expected).unwrap();

        // latitude 20 is out for both longitudes
        assert_eq!(check.out_of_range, 2);
        assert!(!check.all_within);
    }

    #[test]
    fn should_count_rows_outside_region() {
        let handle = DatasetHandle::new("stations.csv", DatasetKind::Tabular)
            .with_variable(Variable::cells(
                "latitude",
                vec![Cell::Float(51.5), Cell::Float(48.8), Cell::Null],
            ))
            .with_variable(Variable::cells(
                "longitude",
                vec![Cell::Float(-0.1), Cell::Float(2.3), Cell::Float(0.0)],
            ))
            .resolve_axes(&AxisAliases::default());
        let expected: BoundingBox = "45,60,-5,5".parse().unwrap();

        let check = check_spatial_bounds(&handle, expected).unwrap();

        assert_eq!(check.out_of_range, 1);
    }

    #[test]
    fn should_skip_bounds_check_without_positions() {
        let handle = DatasetHandle::new("obs.csv", DatasetKind::Tabular)
            .with_variable(Variable::cells("rain", vec![Cell::Float(1.0)]))
            .resolve_axes(&AxisAliases::default());

        assert_eq!(
            check_spatial_bounds(&handle, "0,1,0,1".parse().unwrap()),
            None
        );
    }

    #[test]
    fn should_list_missing_days() {
        let handle = DatasetHandle::new("daily.csv", DatasetKind::Tabular).with_variable(
            Variable::cells(
                "time",
                vec![
                    Cell::Text("2020-01-01".to_string()),
                    Cell::Text("2020-01-02".to_string()),
                    Cell::Text("2020-01-04".to_string()),
                ],
            ),
        );
        let expected: DatePeriod = "2020-01-01,2020-01-05".parse().unwrap();

        let coverage = check_date_coverage(&handle, "time", expected).unwrap();

        assert_eq!(coverage.missing_dates, vec![date(2020, 1, 3), date(2020, 1, 5)]);
        assert_eq!(coverage.actual_start, Some(date(2020, 1, 1)));
        assert_eq!(coverage.actual_end, Some(date(2020, 1, 4)));
    }

    #[test]
    fn should_read_dates_from_time_coordinate() {
        let times = (1..=3)
            .map(|d| date(2021, 3, d).and_hms_opt(12, 0, 0).unwrap())
            .collect();
        let handle = DatasetHandle::new("grid.nc", DatasetKind::Gridded)
            .with_coordinate("time", Coordinate::Temporal(times))
            .resolve_axes(&AxisAliases::default());
        let expected: DatePeriod = "2021-03-01,2021-03-03".parse().unwrap();

        let coverage = check_date_coverage(&handle, "time", expected).unwrap();

        assert!(coverage.missing_dates.is_empty());
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}
