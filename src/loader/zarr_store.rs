//! Zarr directory stores through zarrs.

use std::{fs, path::Path, sync::Arc};

use serde_json::{Map, Value};
use tracing::{debug, warn};
use zarrs::{
    array::{Array, DataType},
    storage::ReadableStorageTraits,
};
use zarrs_filesystem::FilesystemStore;

use super::{cf_time::TimeUnits, LoadOptions};
use crate::{
    dataset::{Coordinate, DatasetHandle, DatasetKind, Variable},
    error::LoadError,
};

/// Reads every top-level array of a store laid out the xarray way: one child
/// array per variable, dimension names under `_ARRAY_DIMENSIONS`.
pub fn read(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let decode = |e: String| LoadError::decode(path, "zarr", e);

    let store = Arc::new(FilesystemStore::new(path).map_err(|e| decode(e.to_string()))?);
    let mut names: Vec<String> = fs::read_dir(path)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let dir = entry.path();
            dir.join(".zarray").is_file() || dir.join("zarr.json").is_file()
        })
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    if names.is_empty() {
        return Err(decode("store holds no arrays".to_string()));
    }

    let mut handle = DatasetHandle::new(path, DatasetKind::Gridded);
    if let Some(attrs) = group_attributes(path) {
        for (key, value) in attrs {
            if let Some(text) = value_text(&value) {
                handle = handle.with_attribute(key, text);
            }
        }
    }

    for name in names {
        let array = Array::open(store.clone(), &format!("/{}", name))
            .map_err(|e| decode(e.to_string()))?;
        let Some(mut values) = read_values(&array).map_err(decode)? else {
            warn!("Skipping array `{}` with non-numeric type", name);
            continue;
        };
        let attrs = array.attributes();
        let dims: Vec<String> = match attrs.get("_ARRAY_DIMENSIONS").and_then(Value::as_array) {
            Some(dims) => dims
                .iter()
                .filter_map(|d| d.as_str().map(str::to_string))
                .collect(),
            None => (0..array.shape().len()).map(|i| format!("dim_{}", i)).collect(),
        };
        for (dim, size) in dims.iter().zip(array.shape()) {
            handle = handle.with_dimension(dim.clone(), *size as usize);
        }
        let units = attrs.get("units").and_then(Value::as_str).map(str::to_string);
        let fill_value = number(attrs, "_FillValue").or_else(|| number(attrs, "missing_value"));

        if dims.len() == 1 && dims[0] == name {
            if let Some(fill) = fill_value {
                values.iter_mut().filter(|v| **v == fill).for_each(|v| *v = f64::NAN);
            }
            let coordinate = match units.as_deref().and_then(TimeUnits::parse) {
                Some(time_units) => time_units
                    .decode_all(&values)
                    .map_or(Coordinate::Numeric(values), Coordinate::Temporal),
                None => Coordinate::Numeric(values),
            };
            debug!(coordinate = %name, len = coordinate.len(), "decoded coordinate");
            handle = handle.with_coordinate(name, coordinate);
            continue;
        }

        let scale = number(attrs, "scale_factor").unwrap_or(1.0);
        let offset = number(attrs, "add_offset").unwrap_or(0.0);
        if scale != 1.0 || offset != 0.0 {
            values
                .iter_mut()
                .filter(|v| !v.is_nan() && Some(**v) != fill_value)
                .for_each(|v| *v = *v * scale + offset);
        }

        let mut variable = Variable::numeric(name, values)
            .with_dtype(format!("{:?}", array.data_type()).to_lowercase())
            .with_dims(dims);
        if let Some(units) = units {
            variable = variable.with_units(units);
        }
        if let Some(long_name) = attrs.get("long_name").and_then(Value::as_str) {
            variable = variable.with_long_name(long_name);
        }
        if let Some(fill) = fill_value {
            variable = variable.with_fill_value(fill);
        }
        handle = handle.with_variable(variable);
    }

    Ok(handle)
}

/// Every element as `f64`, or `None` for types that are not numbers.
fn read_values<S: ReadableStorageTraits + ?Sized + 'static>(
    array: &Array<S>,
) -> Result<Option<Vec<f64>>, String> {
    let subset = array.subset_all();
    macro_rules! widen {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map(|v| Some(v.into_iter().map(|x| x as f64).collect()))
                .map_err(|e| e.to_string())
        };
    }
    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map(Some)
            .map_err(|e| e.to_string()),
        DataType::Float32 => widen!(f32),
        DataType::Int64 => widen!(i64),
        DataType::Int32 => widen!(i32),
        DataType::Int16 => widen!(i16),
        DataType::Int8 => widen!(i8),
        DataType::UInt64 => widen!(u64),
        DataType::UInt32 => widen!(u32),
        DataType::UInt16 => widen!(u16),
        DataType::UInt8 => widen!(u8),
        _ => Ok(None),
    }
}

fn number(attrs: &Map<String, Value>, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s == "NaN" => Some(f64::NAN),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Zarr v2 keeps group attributes in `.zattrs`, v3 under `attributes` in `zarr.json`.
fn group_attributes(path: &Path) -> Option<Map<String, Value>> {
    if let Ok(text) = fs::read_to_string(path.join(".zattrs")) {
        return serde_json::from_str(&text).ok();
    }
    let text = fs::read_to_string(path.join("zarr.json")).ok()?;
    let mut metadata: Map<String, Value> = serde_json::from_str(&text).ok()?;
    match metadata.remove("attributes")? {
        Value::Object(attrs) => Some(attrs),
        _ => None,
    }
}
