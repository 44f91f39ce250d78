//! Run configuration: built-in defaults, overlaid by an optional YAML file,
//! overlaid by command line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    analysis::{BoundingBox, DatePeriod, OutlierMethod, QualityOptions, ResolutionPolicy},
    dataset::{AxisAliases, NullMarkers},
    error::ConfigError,
};

pub const DEFAULT_CHECKLIST: &str = "Data_Readiness_Checklist.json";
pub const DEFAULT_BLANK_CHECKLIST: &str = "Data_Readiness_Checklist_blank.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra strings read as missing, on top of the built-in markers.
    pub null_markers: Vec<String>,
    pub outlier_threshold: f64,
    pub outlier_method: OutlierMethod,
    pub resolution_policy: ResolutionPolicy,
    /// Column checked for regular timestamps in tabular files.
    pub time_column: String,
    pub aliases: AxisAliases,
    pub expected_bounds: Option<BoundingBox>,
    pub expected_period: Option<DatePeriod>,
    pub checklist: ChecklistConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            null_markers: Vec::new(),
            outlier_threshold: 3.0,
            outlier_method: OutlierMethod::default(),
            resolution_policy: ResolutionPolicy::default(),
            time_column: "time".to_string(),
            aliases: AxisAliases::default(),
            expected_bounds: None,
            expected_period: None,
            checklist: ChecklistConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistConfig {
    pub path: PathBuf,
    /// Template restored by `checklist reset`.
    pub blank_path: PathBuf,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        ChecklistConfig {
            path: PathBuf::from(DEFAULT_CHECKLIST),
            blank_path: PathBuf::from(DEFAULT_BLANK_CHECKLIST),
        }
    }
}

impl Config {
    /// Reads a YAML file. Keys it leaves out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.outlier_threshold));
        }
        if let Some(bounds) = self.expected_bounds.filter(|b| !b.is_ordered()) {
            return Err(ConfigError::InvalidExpectation(bounds.to_string()));
        }
        if let Some(period) = self.expected_period.filter(|p| !p.is_ordered()) {
            return Err(ConfigError::InvalidExpectation(period.to_string()));
        }
        Ok(())
    }

    pub fn null_markers(&self) -> NullMarkers {
        NullMarkers::new(&self.null_markers)
    }

    pub fn quality_options(&self) -> QualityOptions {
        QualityOptions {
            threshold: self.outlier_threshold,
            method: self.outlier_method,
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use std::io::Write;

    use super::*;

    #[test]
    fn should_default_every_setting() {
        let config = Config::default();

        assert_eq!(config.outlier_threshold, 3.0);
        assert_eq!(config.outlier_method, OutlierMethod::Zscore);
        assert_eq!(config.resolution_policy, ResolutionPolicy::FirstDifference);
        assert_eq!(config.time_column, "time");
        assert_eq!(config.checklist.path, PathBuf::from(DEFAULT_CHECKLIST));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_overlay_yaml_on_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "outlier_threshold: 2.5\n\
             outlier_method: modified-zscore\n\
             resolution_policy: mean-difference\n\
             null_markers: ['-999']\n\
             aliases:\n  latitude: [y]\n  longitude: [x]\n\
             expected_bounds: {{min_lat: 0, max_lat: 10, min_lon: 0, max_lon: 10}}"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.outlier_threshold, 2.5);
        assert_eq!(config.outlier_method, OutlierMethod::ModifiedZscore);
        assert_eq!(config.resolution_policy, ResolutionPolicy::MeanDifference);
        assert!(config.null_markers().is_null("-999"));
        assert_eq!(config.aliases.latitude, vec!["y".to_string()]);
        assert_eq!(config.aliases.time, vec!["time".to_string()]);
        assert_eq!(config.expected_bounds.unwrap().max_lat, 10.0);
        assert_eq!(config.time_column, "time");
    }

    #[test]
    fn should_reject_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "outlier_threshold: [not, a, number]").unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn should_reject_non_positive_threshold() {
        let config = Config {
            outlier_threshold: 0.0,
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn should_reject_inverted_expectations_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "expected_bounds: {{min_lat: 10, max_lat: 0, min_lon: 0, max_lon: 10}}"
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExpectation(text)) if text == "10,0,0,10"
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "expected_period: {{start: 2020-12-31, end: 2020-01-01}}").unwrap();
        let config = Config::from_file(file.path()).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExpectation(_))
        ));
    }
}
