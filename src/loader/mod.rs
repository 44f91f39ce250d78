//! Format detection and decoding.
//!
//! The decoder is chosen from the file extension alone, matched exactly and
//! case-sensitively. Gridded decoders link against system libraries and are
//! behind cargo features; without the feature the format is still recognised
//! but fails to decode.

#[cfg(any(feature = "netcdf", feature = "zarr", test))]
mod cf_time;
#[cfg(feature = "gdal")]
mod geotiff;
#[cfg(feature = "grib")]
mod grib_file;
#[cfg(feature = "netcdf")]
mod netcdf_file;
mod tabular;
#[cfg(feature = "zarr")]
mod zarr_store;

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::{
    config::Config,
    dataset::{AxisAliases, DatasetHandle, DatasetKind, NullMarkers},
    error::LoadError,
};

/// Every extension the loader recognises.
pub const SUPPORTED_EXTENSIONS: [&str; 13] = [
    "nc", "grib", "h5", "hdf5", "tif", "tiff", "zarr", "csv", "tsv", "xls", "xlsx", "json",
    "parquet",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    NetCdf,
    Grib,
    Hdf5,
    GeoTiff,
    Zarr,
    Csv,
    Tsv,
    Excel,
    Json,
    Parquet,
}

impl Format {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let format = match extension {
            "nc" => Format::NetCdf,
            "grib" => Format::Grib,
            "h5" | "hdf5" => Format::Hdf5,
            "tif" | "tiff" => Format::GeoTiff,
            "zarr" => Format::Zarr,
            "csv" => Format::Csv,
            "tsv" => Format::Tsv,
            "xls" | "xlsx" => Format::Excel,
            "json" => Format::Json,
            "parquet" => Format::Parquet,
            _ => return None,
        };
        Some(format)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = extension_of(path);
        Format::from_extension(&extension).ok_or_else(|| LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }

    pub fn kind(&self) -> DatasetKind {
        match self {
            Format::NetCdf | Format::Grib | Format::Hdf5 | Format::GeoTiff | Format::Zarr => {
                DatasetKind::Gridded
            }
            Format::Csv | Format::Tsv | Format::Excel | Format::Json | Format::Parquet => {
                DatasetKind::Tabular
            }
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::NetCdf => "netcdf",
            Format::Grib => "grib",
            Format::Hdf5 => "hdf5",
            Format::GeoTiff => "geotiff",
            Format::Zarr => "zarr",
            Format::Csv => "csv",
            Format::Tsv => "tsv",
            Format::Excel => "excel",
            Format::Json => "json",
            Format::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub null_markers: NullMarkers,
    pub aliases: AxisAliases,
}

impl From<&Config> for LoadOptions {
    fn from(config: &Config) -> Self {
        LoadOptions {
            null_markers: config.null_markers(),
            aliases: config.aliases.clone(),
        }
    }
}

/// Decodes `path` into an in-memory handle with its axes resolved.
///
/// The file is closed before this returns, whatever the outcome. Failures
/// are logged here; callers only need to record them.
pub fn open(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let result = Format::from_path(path).and_then(|format| decode(format, path, options));
    match result {
        Ok(handle) => {
            let handle = handle.resolve_axes(&options.aliases);
            info!(
                "Loaded {} ({}, {} variables)",
                path.display(),
                handle.kind(),
                handle.variables().len()
            );
            Ok(handle)
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

fn decode(format: Format, path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    match format {
        Format::Csv => tabular::read_delimited(path, b',', options),
        Format::Tsv => tabular::read_delimited(path, b'\t', options),
        Format::Excel => tabular::read_excel(path, options),
        Format::Json => tabular::read_json(path, options),
        Format::Parquet => tabular::read_parquet(path, options),
        Format::NetCdf | Format::Hdf5 => read_netcdf(path, options),
        Format::Grib => read_grib(path, options),
        Format::Zarr => read_zarr(path, options),
        Format::GeoTiff => read_geotiff(path, options),
    }
}

#[cfg(feature = "netcdf")]
fn read_netcdf(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    netcdf_file::read(path, options)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    Err(not_compiled(path, "netcdf"))
}

#[cfg(feature = "grib")]
fn read_grib(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    grib_file::read(path, options)
}

#[cfg(not(feature = "grib"))]
fn read_grib(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    Err(not_compiled(path, "grib"))
}

#[cfg(feature = "zarr")]
fn read_zarr(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    zarr_store::read(path, options)
}

#[cfg(not(feature = "zarr"))]
fn read_zarr(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    Err(not_compiled(path, "zarr"))
}

#[cfg(feature = "gdal")]
fn read_geotiff(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    geotiff::read(path, options)
}

#[cfg(not(feature = "gdal"))]
fn read_geotiff(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    Err(not_compiled(path, "gdal"))
}

#[cfg(not(all(feature = "netcdf", feature = "grib", feature = "zarr", feature = "gdal")))]
fn not_compiled(path: &Path, feature: &str) -> LoadError {
    LoadError::decode(
        path,
        &extension_of(path),
        format!(
            "support not compiled in; rebuild with `--features {}`",
            feature
        ),
    )
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

// -- Tests -------------------------------------------------------------------
