//! Missing values, fill values and outliers per data variable.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::DatasetHandle;

/// Scales the median absolute deviation to a standard deviation under normality.
const MAD_SCALE: f64 = 0.6745;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierMethod {
    /// `|x - mean| / std` with the population standard deviation.
    #[default]
    Zscore,
    /// `0.6745 * |x - median| / MAD`.
    ModifiedZscore,
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlierMethod::Zscore => f.write_str("zscore"),
            OutlierMethod::ModifiedZscore => f.write_str("modified-zscore"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityOptions {
    pub threshold: f64,
    pub method: OutlierMethod,
}

impl Default for QualityOptions {
    fn default() -> Self {
        QualityOptions {
            threshold: 3.0,
            method: OutlierMethod::Zscore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableQuality {
    pub name: String,
    pub total: usize,
    pub missing: usize,
    pub missing_percent: f64,
    pub has_fill_value: bool,
    pub fill_value: Option<f64>,
    pub fill_count: usize,
    pub fill_percent: f64,
    pub outliers: usize,
    pub outlier_percent: f64,
    pub threshold: f64,
    pub method: OutlierMethod,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Assesses every numeric, non-bounds variable of a handle.
///
/// Text and mixed tabular columns are skipped; their problems show up in the
/// table summary instead.
pub fn analyze_quality(handle: &DatasetHandle, options: QualityOptions) -> Vec<VariableQuality> {
    let records: Vec<VariableQuality> = handle
        .variables()
        .iter()
        .filter(|v| !v.is_bounds())
        .filter_map(|v| {
            let values = v.numeric_values()?;
            Some(assess_values(
                &v.name,
                &values,
                v.attributes.fill_value,
                options,
            ))
        })
        .collect();

    let missing: usize = records.iter().map(|r| r.missing).sum();
    let total: usize = records.iter().map(|r| r.total).sum();
    info!(
        "Missing values in {}: {} of {} ({:.2}%) across {} variables",
        handle.source().display(),
        missing,
        total,
        percent(missing, total),
        records.len()
    );

    records
}

/// Quality record for one variable. NaN entries are null.
pub fn assess_values(
    name: &str,
    values: &[f64],
    fill_value: Option<f64>,
    options: QualityOptions,
) -> VariableQuality {
    let total = values.len();
    let missing = values.iter().filter(|v| v.is_nan()).count();
    let fill_count = match fill_value {
        Some(fill) => values.iter().filter(|v| **v == fill).count(),
        None => 0,
    };

    let valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan() && Some(*v) != fill_value)
        .collect();
    let outliers = count_outliers(&valid, options.threshold, options.method);
    let (mean, std_dev) = match mean_and_std(&valid) {
        Some((m, s)) => (Some(m), Some(s)),
        None => (None, None),
    };

    debug!(variable = name, total, missing, fill_count, outliers, "variable quality");

    VariableQuality {
        name: name.to_string(),
        total,
        missing,
        missing_percent: percent(missing, total),
        has_fill_value: fill_value.is_some(),
        fill_value,
        fill_count,
        fill_percent: percent(fill_count, total),
        outliers,
        outlier_percent: percent(outliers, total),
        threshold: options.threshold,
        method: options.method,
        mean,
        std_dev,
    }
}

/// `100 * count / total`, or 0 for an empty variable.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Counts values whose score exceeds `threshold`.
///
/// A constant series has no spread and therefore no outliers.
pub fn count_outliers(valid: &[f64], threshold: f64, method: OutlierMethod) -> usize {
    match method {
        OutlierMethod::Zscore => {
            let Some((mean, std)) = mean_and_std(valid) else {
                return 0;
            };
            if std == 0.0 || !std.is_finite() {
                return 0;
            }
            valid
                .iter()
                .filter(|v| ((**v - mean) / std).abs() > threshold)
                .count()
        }
        OutlierMethod::ModifiedZscore => {
            let Some(centre) = median(valid.to_vec()) else {
                return 0;
            };
            let deviations: Vec<f64> = valid.iter().map(|v| (v - centre).abs()).collect();
            let mad = match median(deviations) {
                Some(mad) if mad > 0.0 && mad.is_finite() => mad,
                _ => return 0,
            };
            valid
                .iter()
                .filter(|v| (MAD_SCALE * (**v - centre) / mad).abs() > threshold)
                .count()
        }
    }
}

/// Mean and population standard deviation.
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use proptest::prelude::*;

    use super::*;
    use crate::dataset::{AxisAliases, Cell, Coordinate, DatasetKind, Variable};

    #[test]
    fn should_count_missing_and_fill_values() {
        let values = [1.0, f64::NAN, -999.0, 2.0, -999.0];

        let record = assess_values("tas", &values, Some(-999.0), QualityOptions::default());

        assert_eq!(record.total, 5);
        assert_eq!(record.missing, 1);
        assert_eq!(record.missing_percent, 20.0);
        assert!(record.has_fill_value);
        assert_eq!(record.fill_count, 2);
        assert_eq!(record.fill_percent, 40.0);
        assert_eq!(record.mean, Some(1.5));
    }

    #[test]
    fn should_not_flag_small_sample_with_classical_zscore() {
        // With five samples no value can exceed |z| = 2.
        let valid = [1.0, 2.0, 3.0, 4.0, 1000.0];

        assert_eq!(count_outliers(&valid, 3.0, OutlierMethod::Zscore), 0);
        assert_eq!(count_outliers(&valid, 1.5, OutlierMethod::Zscore), 1);
    }

    #[test]
    fn should_flag_spike_with_modified_zscore() {
        let valid = [1.0, 2.0, 3.0, 4.0, 1000.0];

        assert_eq!(count_outliers(&valid, 3.0, OutlierMethod::ModifiedZscore), 1);
    }

    #[test]
    fn should_flag_spike_in_long_series() {
        let mut valid: Vec<f64> = (0..50).map(|i| (i % 5) as f64).collect();
        valid.push(1000.0);

        assert_eq!(count_outliers(&valid, 3.0, OutlierMethod::Zscore), 1);
    }

    #[test]
    fn should_find_no_outliers_in_constant_series() {
        let valid = [7.0; 10];

        assert_eq!(count_outliers(&valid, 3.0, OutlierMethod::Zscore), 0);
        assert_eq!(count_outliers(&valid, 3.0, OutlierMethod::ModifiedZscore), 0);
        assert_eq!(count_outliers(&[], 3.0, OutlierMethod::Zscore), 0);
    }

    #[test]
    fn should_exclude_fill_values_from_outlier_statistics() {
        let mut values: Vec<f64> = (0..20).map(|i| (i % 4) as f64).collect();
        values.extend([-9999.0, -9999.0]);

        let record = assess_values("pr", &values, Some(-9999.0), QualityOptions::default());

        assert_eq!(record.outliers, 0);
        assert_eq!(record.fill_count, 2);
    }

    #[test]
    fn should_report_zero_percent_for_empty_variable() {
        let record = assess_values("empty", &[], None, QualityOptions::default());

        assert_eq!(record.total, 0);
        assert_eq!(record.missing_percent, 0.0);
        assert_eq!(record.outlier_percent, 0.0);
        assert!(!record.has_fill_value);
        assert_eq!(record.mean, None);
    }

    #[test]
    fn should_assess_every_measurement_variable() {
        let handle = DatasetHandle::new("era5.nc", DatasetKind::Gridded)
            .with_coordinate("lat", Coordinate::Numeric(vec![0.0, 1.0]))
            .with_coordinate("lon", Coordinate::Numeric(vec![0.0, 1.0]))
            .with_variable(Variable::numeric("tas", vec![1.0, f64::NAN, 3.0, 4.0]))
            .with_variable(Variable::numeric("pr", vec![f64::NAN, f64::NAN, 0.0, 0.0]))
            .with_variable(Variable::numeric("lat_bnds", vec![f64::NAN; 4]))
            .resolve_axes(&AxisAliases::default());

        let records = analyze_quality(&handle, QualityOptions::default());

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["tas", "pr"]);
        let missing: usize = records.iter().map(|r| r.missing).sum();
        assert_eq!(missing, 3);
    }

    #[test]
    fn should_skip_text_columns_but_assess_position_columns() {
        let handle = DatasetHandle::new("stations.csv", DatasetKind::Tabular)
            .with_variable(Variable::cells(
                "name",
                vec![Cell::Text("a".to_string()), Cell::Text("b".to_string())],
            ))
            .with_variable(Variable::cells("lat", vec![Cell::Null, Cell::Float(2.0)]))
            .with_variable(Variable::cells("lon", vec![Cell::Float(1.0), Cell::Float(2.0)]))
            .with_variable(Variable::cells("rain", vec![Cell::Integer(3), Cell::Null]))
            .resolve_axes(&AxisAliases::default());

        let records = analyze_quality(&handle, QualityOptions::default());

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["lat", "lon", "rain"]);
        assert_eq!(records[0].missing, 1);
        assert_eq!(records[1].missing, 0);
        assert_eq!(records[2].missing, 1);
    }

    proptest! {
        #[test]
        fn should_keep_percentages_in_range(
            values in prop::collection::vec(
                prop_oneof![Just(f64::NAN), Just(-999.0), -1.0e6..1.0e6f64],
                0..200,
            ),
            threshold in 0.1..10.0f64,
        ) {
            let options = QualityOptions { threshold, method: OutlierMethod::Zscore };
            let record = assess_values("v", &values, Some(-999.0), options);

            for pct in [record.missing_percent, record.fill_percent, record.outlier_percent] {
                prop_assert!((0.0..=100.0).contains(&pct));
            }
            prop_assert!(record.missing + record.fill_count <= record.total);
        }
    }
}
