//! GeoTIFF rasters through GDAL.

use std::path::Path;

use gdal::Dataset;

use super::{extension_of, LoadOptions};
use crate::{
    dataset::{Coordinate, DatasetHandle, DatasetKind, Variable},
    error::LoadError,
};

/// Reads every band into a single `band_data` variable over `(band, y, x)`.
///
/// `x` and `y` are pixel-centre positions from the geotransform, in the
/// raster's own CRS, so they only count as longitude/latitude when aliased.
pub fn read(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let extension = extension_of(path);
    let decode = |e: gdal::errors::GdalError| LoadError::decode(path, &extension, e);

    let dataset = Dataset::open(path).map_err(decode)?;
    let (width, height) = dataset.raster_size();
    let bands = dataset.raster_count();
    let transform = dataset.geo_transform().map_err(decode)?;

    let x: Vec<f64> = (0..width)
        .map(|col| transform[0] + (col as f64 + 0.5) * transform[1])
        .collect();
    let y: Vec<f64> = (0..height)
        .map(|row| transform[3] + (row as f64 + 0.5) * transform[5])
        .collect();

    let mut values = Vec::with_capacity(width * height * bands);
    let mut fill_value = None;
    for index in 1..=bands {
        let band = dataset.rasterband(index).map_err(decode)?;
        if fill_value.is_none() {
            fill_value = band.no_data_value();
        }
        let buffer = band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .map_err(decode)?;
        values.extend(buffer.into_shape_and_vec().1);
    }

    let mut variable = Variable::numeric("band_data", values).with_dims(vec![
        "band".to_string(),
        "y".to_string(),
        "x".to_string(),
    ]);
    if let Some(fill) = fill_value {
        variable = variable.with_fill_value(fill);
    }

    let handle = DatasetHandle::new(path, DatasetKind::Gridded)
        .with_coordinate(
            "band",
            Coordinate::Numeric((1..=bands).map(|b| b as f64).collect()),
        )
        .with_coordinate("y", Coordinate::Numeric(y))
        .with_coordinate("x", Coordinate::Numeric(x))
        .with_variable(variable);

    Ok(handle)
}
