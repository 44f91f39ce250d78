//! The in-memory dataset handle shared by every analyzer.
//!
//! A handle is built by a decoder in [`crate::loader`] and is read-only from then
//! on. Decoders copy what the analyzers need into memory and close the underlying
//! file before returning, so dropping the handle releases everything it holds.

pub mod axes;
pub mod cell;

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use axes::{AxisAliases, ResolvedAxes};
pub use cell::{Cell, CellType, NullMarkers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Gridded,
    Tabular,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::Gridded => f.write_str("gridded"),
            DatasetKind::Tabular => f.write_str("tabular"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Ordered labels along one axis.
pub enum Coordinate {
    Numeric(Vec<f64>),
    Temporal(Vec<NaiveDateTime>),
}

impl Coordinate {
    pub fn len(&self) -> usize {
        match self {
            Coordinate::Numeric(v) => v.len(),
            Coordinate::Temporal(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Coordinate::Numeric(v) => Some(v),
            Coordinate::Temporal(_) => None,
        }
    }

    pub fn as_temporal(&self) -> Option<&[NaiveDateTime]> {
        match self {
            Coordinate::Temporal(v) => Some(v),
            Coordinate::Numeric(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Per-variable metadata.
pub struct Attributes {
    pub units: Option<String>,
    pub long_name: Option<String>,
    /// Sentinel meaning "no data", distinct from NaN.
    pub fill_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Gridded values; NaN marks a null entry.
    Numeric(Vec<f64>),
    /// Tabular cells.
    Cells(Vec<Cell>),
}

#[derive(Debug, Clone, PartialEq)]
/// A data variable (gridded) or a column (tabular).
pub struct Variable {
    pub name: String,
    pub dtype: String,
    pub dims: Vec<String>,
    pub values: Values,
    pub attributes: Attributes,
}

impl Variable {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Variable {
            name: name.into(),
            dtype: "float64".to_string(),
            dims: Vec::new(),
            values: Values::Numeric(values),
            attributes: Attributes::default(),
        }
    }

    pub fn cells(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        let dtype = dtype_label(&cells);
        Variable {
            name: name.into(),
            dtype,
            dims: Vec::new(),
            values: Values::Cells(cells),
            attributes: Attributes::default(),
        }
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn with_dims(mut self, dims: Vec<String>) -> Self {
        self.dims = dims;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.attributes.units = Some(units.into());
        self
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.attributes.long_name = Some(long_name.into());
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.attributes.fill_value = Some(fill_value);
        self
    }

    pub fn len(&self) -> usize {
        match &self.values {
            Values::Numeric(v) => v.len(),
            Values::Cells(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate-bounds helpers (`lat_bnds`, `time_bounds`, ...) are auxiliary,
    /// not measurements.
    pub fn is_bounds(&self) -> bool {
        let name = self.name.to_lowercase();
        name.contains("bnd") || name.contains("bound")
    }

    /// Numeric view with NaN for nulls, or `None` when the column holds
    /// anything other than numbers.
    pub fn numeric_values(&self) -> Option<Cow<'_, [f64]>> {
        match &self.values {
            Values::Numeric(v) => Some(Cow::Borrowed(v.as_slice())),
            Values::Cells(cells) => {
                let mut out = Vec::with_capacity(cells.len());
                for cell in cells {
                    match cell {
                        Cell::Null => out.push(f64::NAN),
                        Cell::Integer(_) | Cell::Float(_) => out.push(cell.as_f64()?),
                        _ => return None,
                    }
                }
                Some(Cow::Owned(out))
            }
        }
    }

    /// Distinct types among the non-null cells. Gridded values report nothing.
    pub fn cell_types(&self) -> BTreeSet<CellType> {
        match &self.values {
            Values::Numeric(_) => BTreeSet::new(),
            Values::Cells(cells) => cells.iter().filter_map(Cell::cell_type).collect(),
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.values {
            Values::Numeric(v) => v.iter().filter(|x| x.is_nan()).count(),
            Values::Cells(c) => c.iter().filter(|x| x.is_null()).count(),
        }
    }
}

fn dtype_label(cells: &[Cell]) -> String {
    let types: BTreeSet<CellType> = cells.iter().filter_map(Cell::cell_type).collect();
    match types.len() {
        0 => "float64".to_string(),
        1 => match types.iter().next() {
            Some(CellType::Boolean) => "bool".to_string(),
            Some(CellType::Integer) => "int64".to_string(),
            Some(CellType::Float) => "float64".to_string(),
            Some(CellType::DateTime) => "datetime64".to_string(),
            _ => "object".to_string(),
        },
        2 if types.contains(&CellType::Integer) && types.contains(&CellType::Float) => {
            "float64".to_string()
        }
        _ => "object".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct DatasetHandle {
    source: PathBuf,
    kind: DatasetKind,
    dimensions: BTreeMap<String, usize>,
    coordinates: BTreeMap<String, Coordinate>,
    variables: Vec<Variable>,
    attributes: BTreeMap<String, String>,
    axes: ResolvedAxes,
}

impl DatasetHandle {
    pub fn new(source: impl AsRef<Path>, kind: DatasetKind) -> Self {
        DatasetHandle {
            source: source.as_ref().to_path_buf(),
            kind,
            dimensions: BTreeMap::new(),
            coordinates: BTreeMap::new(),
            variables: Vec::new(),
            attributes: BTreeMap::new(),
            axes: ResolvedAxes::default(),
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, size: usize) -> Self {
        self.dimensions.insert(name.into(), size);
        self
    }

    /// Adds a coordinate and its dimension of the same name.
    pub fn with_coordinate(mut self, name: impl Into<String>, coordinate: Coordinate) -> Self {
        let name = name.into();
        self.dimensions.entry(name.clone()).or_insert(coordinate.len());
        self.coordinates.insert(name, coordinate);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Fixes the canonical latitude, longitude and time names. Gridded handles
    /// look among coordinates, tabular handles among columns.
    pub fn resolve_axes(mut self, aliases: &AxisAliases) -> Self {
        let axes = ResolvedAxes::resolve(aliases, |name| match self.kind {
            DatasetKind::Gridded => self.coordinates.contains_key(name),
            DatasetKind::Tabular => self.variable(name).is_some(),
        });
        self.axes = axes;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn dimensions(&self) -> &BTreeMap<String, usize> {
        &self.dimensions
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.coordinates.get(name)
    }

    pub fn coordinates(&self) -> &BTreeMap<String, Coordinate> {
        &self.coordinates
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn axes(&self) -> &ResolvedAxes {
        &self.axes
    }

    pub fn latitude(&self) -> Option<&Coordinate> {
        self.axes.latitude.as_deref().and_then(|n| self.coordinate(n))
    }

    pub fn longitude(&self) -> Option<&Coordinate> {
        self.axes.longitude.as_deref().and_then(|n| self.coordinate(n))
    }

    pub fn time(&self) -> Option<&Coordinate> {
        self.axes.time.as_deref().and_then(|n| self.coordinate(n))
    }

    /// Rows in a tabular handle; the longest column decides.
    pub fn row_count(&self) -> usize {
        self.variables.iter().map(Variable::len).max().unwrap_or(0)
    }
}

// -- Tests -------------------------------------------------------------------
