//! NetCDF and netCDF-4/HDF5 files through libnetcdf.

use std::path::Path;

use netcdf::AttributeValue;
use tracing::{debug, warn};

use super::{cf_time::TimeUnits, extension_of, LoadOptions};
use crate::{
    dataset::{Coordinate, DatasetHandle, DatasetKind, Variable},
    error::LoadError,
};

/// Reads every numeric variable into memory and closes the file.
///
/// A one-dimensional variable named after its dimension is a coordinate.
/// Coordinates with CF time units are decoded to timestamps. Data variables
/// get `scale_factor`/`add_offset` applied to every entry except the fill
/// value, which is kept raw so it can be counted.
pub fn read(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let extension = extension_of(path);
    let file = netcdf::open(path).map_err(|e| LoadError::decode(path, &extension, e))?;

    let mut handle = DatasetHandle::new(path, DatasetKind::Gridded);
    for attr in file.attributes() {
        if let Some(text) = attr.value().ok().and_then(attribute_text) {
            handle = handle.with_attribute(attr.name(), text);
        }
    }
    for dim in file.dimensions() {
        handle = handle.with_dimension(dim.name(), dim.len());
    }

    for var in file.variables() {
        let name = var.name();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let mut values = match var.get_values::<f64, _>(..) {
            Ok(values) => values,
            Err(e) => {
                warn!("Skipping non-numeric variable `{}`: {}", name, e);
                continue;
            }
        };
        let units = text_attribute(&var, "units");
        let fill_value =
            numeric_attribute(&var, "_FillValue").or_else(|| numeric_attribute(&var, "missing_value"));

        if dims.len() == 1 && dims[0] == name {
            if let Some(fill) = fill_value {
                values.iter_mut().filter(|v| **v == fill).for_each(|v| *v = f64::NAN);
            }
            let coordinate = match units.as_deref().and_then(TimeUnits::parse) {
                Some(time_units) => match time_units.decode_all(&values) {
                    Some(times) => Coordinate::Temporal(times),
                    None => Coordinate::Numeric(values),
                },
                None => Coordinate::Numeric(values),
            };
            debug!(coordinate = %name, len = coordinate.len(), "decoded coordinate");
            handle = handle.with_coordinate(name, coordinate);
            continue;
        }

        let scale = numeric_attribute(&var, "scale_factor").unwrap_or(1.0);
        let offset = numeric_attribute(&var, "add_offset").unwrap_or(0.0);
        if scale != 1.0 || offset != 0.0 {
            values
                .iter_mut()
                .filter(|v| !v.is_nan() && Some(**v) != fill_value)
                .for_each(|v| *v = *v * scale + offset);
        }

        let mut variable = Variable::numeric(name, values)
            .with_dtype(format!("{:?}", var.vartype()).to_lowercase())
            .with_dims(dims);
        if let Some(units) = units {
            variable = variable.with_units(units);
        }
        if let Some(long_name) = text_attribute(&var, "long_name") {
            variable = variable.with_long_name(long_name);
        }
        if let Some(fill) = fill_value {
            variable = variable.with_fill_value(fill);
        }
        handle = handle.with_variable(variable);
    }

    Ok(handle)
}

fn text_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    attribute_number(var.attribute_value(name)?.ok()?)
}

fn attribute_number(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(x) => Some(x),
        AttributeValue::Float(x) => Some(x as f64),
        AttributeValue::Int(x) => Some(x as f64),
        AttributeValue::Short(x) => Some(x as f64),
        AttributeValue::Schar(x) => Some(x as f64),
        AttributeValue::Uchar(x) => Some(x as f64),
        AttributeValue::Ushort(x) => Some(x as f64),
        AttributeValue::Uint(x) => Some(x as f64),
        AttributeValue::Longlong(x) => Some(x as f64),
        AttributeValue::Ulonglong(x) => Some(x as f64),
        AttributeValue::Doubles(xs) => xs.first().copied(),
        AttributeValue::Floats(xs) => xs.first().map(|x| *x as f64),
        AttributeValue::Ints(xs) => xs.first().map(|x| *x as f64),
        AttributeValue::Shorts(xs) => xs.first().map(|x| *x as f64),
        _ => None,
    }
}

// Global attributes worth carrying: strings, and scalars such as a numeric version.
fn attribute_text(value: AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(ss) => Some(ss.join(", ")),
        other => attribute_number(other).map(|x| x.to_string()),
    }
}
