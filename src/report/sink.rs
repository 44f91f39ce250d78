//! Write a batch report to JSON, CSV or Parquet.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt64Array},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use tracing::info;

use super::{BatchReport, ReportRow};
use crate::error::{ConfigError, SinkError};

/// Written in CSV cells whose value is undefined.
pub const UNDEFINED: &str = "undefined";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    Json,
    Csv,
    Parquet,
}

impl SinkFormat {
    /// Chooses the sink from the output extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SinkFormat::Json),
            Some("csv") => Ok(SinkFormat::Csv),
            Some("parquet") => Ok(SinkFormat::Parquet),
            other => Err(ConfigError::UnsupportedOutput(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

pub fn write_report(batch: &BatchReport, path: &Path, format: SinkFormat) -> Result<(), SinkError> {
    match format {
        SinkFormat::Json => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, batch)?;
            writer.flush()?;
        }
        SinkFormat::Csv => {
            let batch = record_batch(&batch.rows())?;
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .with_null(UNDEFINED.to_string())
                .build(BufWriter::new(File::create(path)?));
            writer.write(&batch)?;
            writer.into_inner().flush()?;
        }
        SinkFormat::Parquet => {
            let batch = record_batch(&batch.rows())?;
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(File::create(path)?, batch.schema(), Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
        }
    }
    info!("Report written to {}", path.display());
    Ok(())
}

fn schema() -> SchemaRef {
    let text = |name: &str, nullable| Field::new(name, DataType::Utf8, nullable);
    let float = |name: &str| Field::new(name, DataType::Float64, true);
    let count = |name: &str| Field::new(name, DataType::UInt64, true);
    let flag = |name: &str| Field::new(name, DataType::Boolean, true);

    Arc::new(Schema::new(vec![
        text("file", false),
        text("format", true),
        text("kind", true),
        count("file_size_bytes"),
        text("dataset_name", true),
        text("dataset_version", true),
        float("lat_resolution"),
        float("lon_resolution"),
        float("lat_min"),
        float("lat_max"),
        float("lon_min"),
        float("lon_max"),
        flag("spatial_consistency"),
        Field::new("time_resolution_hours", DataType::Int64, true),
        text("time_start", true),
        text("time_end", true),
        flag("temporal_consistency"),
        text("resolution_policy", false),
        Field::new("variables_assessed", DataType::UInt64, false),
        count("total_values"),
        count("missing_values"),
        float("missing_percent"),
        count("fill_values"),
        float("fill_percent"),
        count("outliers"),
        float("outlier_percent"),
        count("row_count"),
        count("column_count"),
        count("missing_cells"),
        text("mixed_type_columns", true),
        flag("table_time_consistency"),
        flag("bounds_all_within"),
        count("bounds_out_of_range"),
        count("missing_dates"),
    ]))
}

/// One record batch with a row per report, columns in the order of [`ReportRow`].
pub fn record_batch(rows: &[ReportRow]) -> Result<RecordBatch, arrow::error::ArrowError> {
    fn text<'a>(rows: &'a [ReportRow], f: impl Fn(&'a ReportRow) -> Option<&'a str>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<StringArray>())
    }
    fn float(rows: &[ReportRow], f: impl Fn(&ReportRow) -> Option<f64>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    }
    fn count(rows: &[ReportRow], f: impl Fn(&ReportRow) -> Option<u64>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<UInt64Array>())
    }
    fn flag(rows: &[ReportRow], f: impl Fn(&ReportRow) -> Option<bool>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<BooleanArray>())
    }

    let columns: Vec<ArrayRef> = vec![
        text(rows, |r| Some(r.file.as_str())),
        text(rows, |r| r.format.as_deref()),
        text(rows, |r| r.kind.as_deref()),
        count(rows, |r| r.file_size_bytes),
        text(rows, |r| r.dataset_name.as_deref()),
        text(rows, |r| r.dataset_version.as_deref()),
        float(rows, |r| r.lat_resolution),
        float(rows, |r| r.lon_resolution),
        float(rows, |r| r.lat_min),
        float(rows, |r| r.lat_max),
        float(rows, |r| r.lon_min),
        float(rows, |r| r.lon_max),
        flag(rows, |r| r.spatial_consistency),
        Arc::new(
            rows.iter()
                .map(|r| r.time_resolution_hours)
                .collect::<Int64Array>(),
        ),
        text(rows, |r| r.time_start.as_deref()),
        text(rows, |r| r.time_end.as_deref()),
        flag(rows, |r| r.temporal_consistency),
        text(rows, |r| Some(r.resolution_policy.as_str())),
        count(rows, |r| Some(r.variables_assessed)),
        count(rows, |r| r.total_values),
        count(rows, |r| r.missing_values),
        float(rows, |r| r.missing_percent),
        count(rows, |r| r.fill_values),
        float(rows, |r| r.fill_percent),
        count(rows, |r| r.outliers),
        float(rows, |r| r.outlier_percent),
        count(rows, |r| r.row_count),
        count(rows, |r| r.column_count),
        count(rows, |r| r.missing_cells),
        text(rows, |r| r.mixed_type_columns.as_deref()),
        flag(rows, |r| r.table_time_consistency),
        flag(rows, |r| r.bounds_all_within),
        count(rows, |r| r.bounds_out_of_range),
        count(rows, |r| r.missing_dates),
    ];

    RecordBatch::try_new(schema(), columns)
}

// -- Tests -------------------------------------------------------------------
