//! Per-file and per-batch readiness reports.
//!
//! Every field of a [`FileReport`] is always present. Undefined values are
//! `None`, written as `null` in JSON and `undefined` in CSV, so the rows of a
//! batch never go ragged.

pub mod sink;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    analysis::{
        coverage::{BoundsCheck, DateCoverage},
        quality::percent,
        SpatialSummary, TableSummary, TemporalSummary, VariableQuality,
    },
    dataset::{DatasetHandle, DatasetKind},
    error::LoadError,
    loader::Format,
};

pub use sink::{write_report, SinkFormat};

/// Unit shown for variables without a `units` attribute.
pub const UNKNOWN_UNITS: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralInfo {
    pub dataset_name: Option<String>,
    pub dataset_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub dtype: String,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub format: Option<Format>,
    pub kind: Option<DatasetKind>,
    pub file_size_bytes: Option<u64>,
    pub general: GeneralInfo,
    pub variables: Vec<VariableInfo>,
    pub spatial: SpatialSummary,
    pub temporal: TemporalSummary,
    pub quality: Vec<VariableQuality>,
    pub table: TableSummary,
    pub bounds: Option<BoundsCheck>,
    pub dates: Option<DateCoverage>,
}

/// Assembles the core of a report. Pure: the remaining sections are added
/// with the `with_*` builders.
pub fn aggregate(
    path: &Path,
    spatial: SpatialSummary,
    temporal: TemporalSummary,
    quality: Vec<VariableQuality>,
) -> FileReport {
    let format = Format::from_path(path).ok();
    FileReport {
        file: path.to_path_buf(),
        format,
        kind: format.map(|f| f.kind()),
        file_size_bytes: None,
        general: GeneralInfo::default(),
        variables: Vec::new(),
        spatial,
        temporal,
        quality,
        table: TableSummary::default(),
        bounds: None,
        dates: None,
    }
}

impl FileReport {
    /// Copies the general information and variable inventory of a handle.
    pub fn with_inventory(mut self, handle: &DatasetHandle) -> Self {
        self.kind = Some(handle.kind());
        self.general = GeneralInfo {
            dataset_name: handle.attribute("title").map(str::to_string),
            dataset_version: handle.attribute("version").map(str::to_string),
        };
        self.variables = handle
            .variables()
            .iter()
            .map(|v| VariableInfo {
                name: v.name.clone(),
                dtype: v.dtype.clone(),
                units: v
                    .attributes
                    .units
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_UNITS.to_string()),
            })
            .collect();
        self
    }

    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size_bytes = Some(bytes);
        self
    }

    pub fn with_table(mut self, table: TableSummary) -> Self {
        self.table = table;
        self
    }

    pub fn with_bounds(mut self, bounds: Option<BoundsCheck>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_dates(mut self, dates: Option<DateCoverage>) -> Self {
        self.dates = dates;
        self
    }

    /// Quality totals over every assessed variable.
    pub fn quality_totals(&self) -> QualityTotals {
        QualityTotals {
            variables: self.quality.len(),
            values: self.quality.iter().map(|q| q.total).sum(),
            missing: self.quality.iter().map(|q| q.missing).sum(),
            fill: self.quality.iter().map(|q| q.fill_count).sum(),
            outliers: self.quality.iter().map(|q| q.outliers).sum(),
        }
    }

    /// Flattens the report into the fixed columns of the tabular sinks.
    pub fn row(&self) -> ReportRow {
        let totals = self.quality_totals();
        let assessed = |count: usize| (totals.variables > 0).then_some(count as u64);
        let share = |count: usize| (totals.variables > 0).then(|| percent(count, totals.values));
        let resolution = self.spatial.resolution;
        let coverage = self.spatial.coverage;
        let time_coverage = self.temporal.coverage;

        ReportRow {
            file: self.file.display().to_string(),
            format: self.format.map(|f| f.to_string()),
            kind: self.kind.map(|k| k.to_string()),
            file_size_bytes: self.file_size_bytes,
            dataset_name: self.general.dataset_name.clone(),
            dataset_version: self.general.dataset_version.clone(),
            lat_resolution: resolution.and_then(|r| r.latitude),
            lon_resolution: resolution.and_then(|r| r.longitude),
            lat_min: coverage.map(|c| c.latitude.min),
            lat_max: coverage.map(|c| c.latitude.max),
            lon_min: coverage.map(|c| c.longitude.min),
            lon_max: coverage.map(|c| c.longitude.max),
            spatial_consistency: self.spatial.consistency.as_bool(),
            time_resolution_hours: self.temporal.resolution_hours,
            time_start: time_coverage.map(|c| format_time(c.start)),
            time_end: time_coverage.map(|c| format_time(c.end)),
            temporal_consistency: self.temporal.consistency.as_bool(),
            resolution_policy: self.temporal.policy.to_string(),
            variables_assessed: totals.variables as u64,
            total_values: assessed(totals.values),
            missing_values: assessed(totals.missing),
            missing_percent: share(totals.missing),
            fill_values: assessed(totals.fill),
            fill_percent: share(totals.fill),
            outliers: assessed(totals.outliers),
            outlier_percent: share(totals.outliers),
            row_count: self.table.row_count.map(|n| n as u64),
            column_count: self.table.column_count.map(|n| n as u64),
            missing_cells: self.table.missing_cells.map(|n| n as u64),
            mixed_type_columns: self
                .table
                .mixed_type_columns
                .as_ref()
                .map(|m| m.keys().cloned().collect::<Vec<_>>().join(";")),
            table_time_consistency: self.table.time_consistency.as_bool(),
            bounds_all_within: self.bounds.as_ref().map(|b| b.all_within),
            bounds_out_of_range: self.bounds.as_ref().map(|b| b.out_of_range as u64),
            missing_dates: self.dates.as_ref().map(|d| d.missing_dates.len() as u64),
        }
    }
}

fn format_time(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTotals {
    pub variables: usize,
    pub values: usize,
    pub missing: usize,
    pub fill: usize,
    pub outliers: usize,
}

/// One row per file, as written by the CSV and Parquet sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub file: String,
    pub format: Option<String>,
    pub kind: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub dataset_name: Option<String>,
    pub dataset_version: Option<String>,
    pub lat_resolution: Option<f64>,
    pub lon_resolution: Option<f64>,
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub spatial_consistency: Option<bool>,
    pub time_resolution_hours: Option<i64>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub temporal_consistency: Option<bool>,
    pub resolution_policy: String,
    pub variables_assessed: u64,
    pub total_values: Option<u64>,
    pub missing_values: Option<u64>,
    pub missing_percent: Option<f64>,
    pub fill_values: Option<u64>,
    pub fill_percent: Option<f64>,
    pub outliers: Option<u64>,
    pub outlier_percent: Option<f64>,
    pub row_count: Option<u64>,
    pub column_count: Option<u64>,
    pub missing_cells: Option<u64>,
    pub mixed_type_columns: Option<String>,
    pub table_time_consistency: Option<bool>,
    pub bounds_all_within: Option<bool>,
    pub bounds_out_of_range: Option<u64>,
    pub missing_dates: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Reports of one run, in processing order.
pub struct BatchReport {
    pub attempted: usize,
    pub processed: usize,
    pub failures: Vec<FileFailure>,
    pub reports: Vec<FileReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a processed file.
    pub fn extend(mut self, report: FileReport) -> Self {
        self.attempted += 1;
        self.processed += 1;
        self.reports.push(report);
        self
    }

    /// Counts a file that could not be processed.
    pub fn record_failure(mut self, path: &Path, error: &LoadError) -> Self {
        self.attempted += 1;
        self.failures.push(FileFailure {
            file: path.to_path_buf(),
            error: error.to_string(),
        });
        self
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.reports.iter().map(FileReport::row).collect()
    }
}

// -- Tests -------------------------------------------------------------------
