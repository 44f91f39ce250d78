//! Runs the analyzers over each input and collects a batch report.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indicatif::ProgressBar;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    analysis::{
        analyze_quality, analyze_spatial, analyze_table, analyze_temporal, check_date_coverage,
        check_spatial_bounds,
    },
    config::Config,
    dataset::DatasetHandle,
    error::{ConfigError, LoadError},
    loader::{self, Format, LoadOptions, SUPPORTED_EXTENSIONS},
    report::{aggregate, BatchReport, FileReport},
};

/// Explicit files as given, followed by the supported files found under each
/// directory.
///
/// Directories are walked in file-name order. A `.zarr` directory is a single
/// input and is not descended into.
pub fn collect_inputs(files: &[PathBuf], dirs: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
    if files.is_empty() && dirs.is_empty() {
        return Err(ConfigError::NoInputs);
    }

    let mut inputs = files.to_vec();
    for dir in dirs {
        let before = inputs.len();
        let mut walker = WalkDir::new(dir).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    continue;
                }
            };
            let format = Format::from_path(entry.path()).ok();
            if entry.file_type().is_dir() {
                if format == Some(Format::Zarr) {
                    inputs.push(entry.path().to_path_buf());
                    walker.skip_current_dir();
                }
                continue;
            }
            if format.is_some_and(|f| f != Format::Zarr) {
                inputs.push(entry.path().to_path_buf());
            }
        }
        debug!("{} inputs found under {}", inputs.len() - before, dir.display());
    }

    if inputs.is_empty() {
        warn!(
            "Nothing to assess; supported extensions are {}",
            SUPPORTED_EXTENSIONS.join(", ")
        );
        return Err(ConfigError::NoSupportedFiles);
    }
    Ok(inputs)
}

/// Every analysis that applies to an open handle.
pub fn assess(handle: &DatasetHandle, config: &Config) -> FileReport {
    let spatial = analyze_spatial(handle);
    let temporal = analyze_temporal(handle, config.resolution_policy);
    let quality = analyze_quality(handle, config.quality_options());

    let bounds = config
        .expected_bounds
        .and_then(|expected| check_spatial_bounds(handle, expected));
    let dates = config
        .expected_period
        .and_then(|expected| check_date_coverage(handle, &config.time_column, expected));

    aggregate(handle.source(), spatial, temporal, quality)
        .with_inventory(handle)
        .with_table(analyze_table(handle, &config.time_column))
        .with_bounds(bounds)
        .with_dates(dates)
}

/// Opens, assesses and releases one input.
pub fn assess_path(path: &Path, config: &Config) -> Result<FileReport, LoadError> {
    let report = {
        let handle = loader::open(path, &LoadOptions::from(config))?;
        assess(&handle, config)
    };

    match size_on_disk(path) {
        Some(bytes) => Ok(report.with_file_size(bytes)),
        None => Ok(report),
    }
}

/// Assesses every input in order. Failures are recorded and skipped.
pub fn run_batch(inputs: &[PathBuf], config: &Config, progress: &ProgressBar) -> BatchReport {
    let batch = inputs.iter().fold(BatchReport::new(), |batch, path| {
        progress.set_message(path.display().to_string());
        let batch = match assess_path(path, config) {
            Ok(report) => batch.extend(report),
            Err(e) => batch.record_failure(path, &e),
        };
        progress.inc(1);
        batch
    });

    info!(
        "Processed {} of {} inputs ({} failed)",
        batch.processed,
        batch.attempted,
        batch.failures.len()
    );
    batch
}

// Directory stores count every file beneath them.
fn size_on_disk(path: &Path) -> Option<u64> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_dir() {
        return Some(metadata.len());
    }
    let total = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum();
    Some(total)
}

// -- Tests -------------------------------------------------------------------
