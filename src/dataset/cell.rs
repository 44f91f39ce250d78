//! Typed cells of tabular columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Strings that always read as missing, whatever the caller configures.
pub const DEFAULT_NULL_MARKERS: [&str; 10] = [
    "", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A", "-nan",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, PartialEq)]
/// A single value of a tabular column.
pub enum Cell {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The type of a non-null cell.
pub enum CellType {
    Boolean,
    Integer,
    Float,
    Text,
    DateTime,
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CellType::Boolean => "boolean",
            CellType::Integer => "integer",
            CellType::Float => "float",
            CellType::Text => "text",
            CellType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

impl Cell {
    /// Builds a float cell, mapping NaN to `Null`.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Cell::Null
        } else {
            Cell::Float(value)
        }
    }

    /// Infers the most specific cell for a raw text field.
    pub fn infer(raw: &str, nulls: &NullMarkers) -> Self {
        let text = raw.trim();
        if nulls.is_null(text) {
            return Cell::Null;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Cell::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Cell::float(f);
        }
        match text {
            "true" | "True" | "TRUE" => return Cell::Boolean(true),
            "false" | "False" | "FALSE" => return Cell::Boolean(false),
            _ => {}
        }
        match parse_datetime(text) {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Text(text.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn cell_type(&self) -> Option<CellType> {
        match self {
            Cell::Null => None,
            Cell::Boolean(_) => Some(CellType::Boolean),
            Cell::Integer(_) => Some(CellType::Integer),
            Cell::Float(_) => Some(CellType::Float),
            Cell::Text(_) => Some(CellType::Text),
            Cell::DateTime(_) => Some(CellType::DateTime),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Reads the cell as a timestamp, parsing text when needed.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => parse_datetime(s),
            _ => None,
        }
    }
}

/// Parses the timestamp layouts found in climate CSV exports.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[derive(Debug, Clone, Default)]
/// Missing-value markers: the defaults plus any supplied by the user.
pub struct NullMarkers {
    custom: Vec<String>,
}

impl NullMarkers {
    pub fn new(custom: &[String]) -> Self {
        NullMarkers {
            custom: custom.iter().map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn is_null(&self, text: &str) -> bool {
        let text = text.trim();
        DEFAULT_NULL_MARKERS.contains(&text) || self.custom.iter().any(|m| m == text)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_infer_cell_types() {
        let nulls = NullMarkers::default();

        assert_eq!(Cell::infer("42", &nulls), Cell::Integer(42));
        assert_eq!(Cell::infer(" 2.5 ", &nulls), Cell::Float(2.5));
        assert_eq!(Cell::infer("TRUE", &nulls), Cell::Boolean(true));
        assert_eq!(Cell::infer("Leeds", &nulls), Cell::Text("Leeds".to_string()));
        assert_eq!(Cell::infer("NA", &nulls), Cell::Null);
        assert_eq!(Cell::infer("", &nulls), Cell::Null);

        let expected = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        assert_eq!(
            Cell::infer("2020-01-02 03:00:00", &nulls),
            Cell::DateTime(expected)
        );
    }

    #[test]
    fn should_treat_custom_markers_as_null() {
        let nulls = NullMarkers::new(&["-999".to_string(), "-9999".to_string()]);

        assert_eq!(Cell::infer("-999", &nulls), Cell::Null);
        assert_eq!(Cell::infer("-9999", &nulls), Cell::Null);
        assert_eq!(Cell::infer("-99", &nulls), Cell::Integer(-99));
    }

    #[test]
    fn should_map_nan_float_to_null() {
        assert_eq!(Cell::float(f64::NAN), Cell::Null);
        assert_eq!(Cell::float(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn should_parse_dates_without_time() {
        let dt = parse_datetime("1999-12-31").unwrap();
        assert_eq!(dt.to_string(), "1999-12-31 00:00:00");

        let dt = parse_datetime("2021-06-01T12:00:00Z").unwrap();
        assert_eq!(dt.to_string(), "2021-06-01 12:00:00");

        assert_eq!(parse_datetime("not a date"), None);
    }
}
