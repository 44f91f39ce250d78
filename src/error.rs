//! Error types for loading, configuration, checklist persistence and report output.

use std::path::PathBuf;

use thiserror::Error;

/// Per-file failures. The batch logs them and moves on.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported file format: `{extension}` for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to decode {} as `{extension}`: {message}", .path.display())]
    Decode {
        path: PathBuf,
        extension: String,
        message: String,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn decode(path: &std::path::Path, extension: &str, message: impl ToString) -> Self {
        LoadError::Decode {
            path: path.to_path_buf(),
            extension: extension.to_string(),
            message: message.to_string(),
        }
    }
}

/// Global failures, reported before any file is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Either --files or --dirs must be specified")]
    NoInputs,

    #[error("No supported data files found in the given inputs")]
    NoSupportedFiles,

    #[error("Unsupported output format `{0}` (expected .json, .csv or .parquet)")]
    UnsupportedOutput(String),

    #[error("Outlier threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),

    #[error("Invalid expectation `{0}`")]
    InvalidExpectation(String),

    #[error("No home directory to save the report in; pass --output")]
    NoHomeDir,

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Error, Debug)]
pub enum ChecklistError {
    #[error("Failed to read checklist {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse checklist {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write checklist {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checklist section `{0}` is not a mapping of fields to values")]
    MalformedSection(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
