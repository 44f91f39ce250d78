//! The readiness checklist: a JSON document of sections, each a mapping of
//! field to value, kept on disk for a human reviewer.
//!
//! Updates are merged two levels deep. A field named in an update replaces
//! the stored field of the same section; every other stored field survives.
//! Update values are never merged recursively.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{json, ser::PrettyFormatter, Map, Value};
use tracing::{debug, info, warn};

use crate::{config::ChecklistConfig, error::ChecklistError, report::FileReport};

/// Fields of one checklist section.
pub type Section = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChecklistDocument {
    sections: Map<String, Value>,
}

impl ChecklistDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a parsed JSON object, rejecting sections that are not objects.
    pub fn from_map(sections: Map<String, Value>) -> Result<Self, ChecklistError> {
        if let Some((name, _)) = sections.iter().find(|(_, fields)| !fields.is_object()) {
            return Err(ChecklistError::MalformedSection(name.clone()));
        }
        Ok(ChecklistDocument { sections })
    }

    /// Adds or replaces one field, creating the section when needed.
    pub fn set(mut self, section: &str, field: &str, value: impl Into<Value>) -> Self {
        let entry = self
            .sections
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Section::new()));
        if let Value::Object(fields) = entry {
            fields.insert(field.to_string(), value.into());
        }
        self
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .filter_map(|(name, fields)| fields.as_object().map(|f| (name.as_str(), f)))
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name).and_then(Value::as_object)
    }

    pub fn get(&self, section: &str, field: &str) -> Option<&Value> {
        self.section(section)?.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Pretty JSON with a four-space indent.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }
}

/// Applies `updates` on top of `document`.
///
/// Known sections are merged field by field; unknown sections are inserted
/// as they are. Applying the same updates again changes nothing.
pub fn merge(mut document: ChecklistDocument, updates: &ChecklistDocument) -> ChecklistDocument {
    for (name, fields) in updates.sections() {
        match document
            .sections
            .get_mut(name)
            .and_then(Value::as_object_mut)
        {
            Some(existing) => {
                for (field, value) in fields {
                    existing.insert(field.clone(), value.clone());
                }
            }
            None => {
                document
                    .sections
                    .insert(name.to_string(), Value::Object(fields.clone()));
            }
        }
    }
    document
}

/// The working checklist and the blank template it is reset from.
#[derive(Debug, Clone)]
pub struct ChecklistStore {
    path: PathBuf,
    blank_path: PathBuf,
}

impl ChecklistStore {
    pub fn new(config: &ChecklistConfig) -> Self {
        ChecklistStore {
            path: config.path.clone(),
            blank_path: config.blank_path.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the working checklist. A checklist that does not exist yet is
    /// empty.
    pub fn load(&self) -> Result<ChecklistDocument, ChecklistError> {
        if !self.path.exists() {
            warn!(
                "Checklist {} does not exist, starting from an empty one",
                self.path.display()
            );
            return Ok(ChecklistDocument::new());
        }
        read_document(&self.path)
    }

    pub fn save(&self, document: &ChecklistDocument) -> Result<(), ChecklistError> {
        let write_error = |source: std::io::Error| ChecklistError::Write {
            path: self.path.clone(),
            source,
        };
        let bytes = document
            .to_pretty_json()
            .map_err(|e| write_error(e.into()))?;
        fs::write(&self.path, bytes).map_err(write_error)?;
        debug!("Checklist saved to {}", self.path.display());
        Ok(())
    }

    /// Loads, merges and saves. Returns the document as written.
    pub fn update(&self, updates: &ChecklistDocument) -> Result<ChecklistDocument, ChecklistError> {
        let document = merge(self.load()?, updates);
        self.save(&document)?;
        info!(
            "Updated {} checklist section(s) in {}",
            updates.sections().count(),
            self.path.display()
        );
        Ok(document)
    }

    /// Overwrites the working checklist with the blank template.
    pub fn reset(&self) -> Result<ChecklistDocument, ChecklistError> {
        let blank = read_document(&self.blank_path)?;
        self.save(&blank)?;
        info!(
            "Checklist {} reset from {}",
            self.path.display(),
            self.blank_path.display()
        );
        Ok(blank)
    }
}

/// Reads a checklist document from any JSON file.
pub fn read_document(path: &Path) -> Result<ChecklistDocument, ChecklistError> {
    let text = fs::read_to_string(path).map_err(|source| ChecklistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let sections: Map<String, Value> =
        serde_json::from_str(&text).map_err(|source| ChecklistError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    ChecklistDocument::from_map(sections)
}

pub const GENERAL_SECTION: &str = "General Information";
pub const VARIABLES_SECTION: &str = "Variables";
pub const SPATIAL_SECTION: &str = "Spatial Information";
pub const TEMPORAL_SECTION: &str = "Temporal Information";
pub const QUALITY_SECTION: &str = "Data Quality";

/// What an assessment found, laid out as checklist updates.
pub fn findings(report: &FileReport) -> ChecklistDocument {
    let row = report.row();
    let mut document = ChecklistDocument::new()
        .set(GENERAL_SECTION, "DatasetName", row.dataset_name.clone())
        .set(GENERAL_SECTION, "DatasetVersion", row.dataset_version.clone())
        .set(GENERAL_SECTION, "FileFormat", row.format.clone())
        .set(GENERAL_SECTION, "FileSizeBytes", row.file_size_bytes);

    for variable in &report.variables {
        document = document.set(
            VARIABLES_SECTION,
            &variable.name,
            json!({ "datatype": variable.dtype, "unit": variable.units }),
        );
    }

    document = document
        .set(SPATIAL_SECTION, "LatitudeResolution", row.lat_resolution)
        .set(SPATIAL_SECTION, "LongitudeResolution", row.lon_resolution)
        .set(SPATIAL_SECTION, "LatitudeRange", range(row.lat_min, row.lat_max))
        .set(SPATIAL_SECTION, "LongitudeRange", range(row.lon_min, row.lon_max))
        .set(SPATIAL_SECTION, "SpatialConsistency", row.spatial_consistency)
        .set(TEMPORAL_SECTION, "TemporalResolutionHours", row.time_resolution_hours)
        .set(TEMPORAL_SECTION, "TemporalCoverageStart", row.time_start.clone())
        .set(TEMPORAL_SECTION, "TemporalCoverageEnd", row.time_end.clone())
        .set(TEMPORAL_SECTION, "TemporalConsistency", row.temporal_consistency)
        .set(QUALITY_SECTION, "MissingValuesPercent", row.missing_percent)
        .set(QUALITY_SECTION, "FillValuesPercent", row.fill_percent)
        .set(QUALITY_SECTION, "OutliersPercent", row.outlier_percent);

    if row.row_count.is_some() {
        document = document
            .set(GENERAL_SECTION, "RowCount", row.row_count)
            .set(GENERAL_SECTION, "ColumnCount", row.column_count)
            .set(QUALITY_SECTION, "MissingCells", row.missing_cells)
            .set(QUALITY_SECTION, "MixedTypeColumns", row.mixed_type_columns.clone());
    }
    document
}

fn range(min: Option<f64>, max: Option<f64>) -> Value {
    match (min, max) {
        (Some(min), Some(max)) => json!([min, max]),
        _ => Value::Null,
    }
}

// -- Tests -------------------------------------------------------------------
