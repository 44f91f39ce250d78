pub mod checklist;
pub mod report;

use std::path::PathBuf;

use chrono::{Datelike, Local};
pub use checklist::checklist;
pub use report::report;

use crate::error::ConfigError;

/// Default report location: `~/readiness-report-YYYY-MM-DD.json`.
pub fn make_report_file_name() -> Result<PathBuf, ConfigError> {
    let today = Local::now();
    let file_name = format!(
        "readiness-report-{}-{:02}-{:02}.json",
        today.year(),
        today.month(),
        today.day()
    );

    dirs::home_dir()
        .map(|home| home.join(file_name))
        .ok_or(ConfigError::NoHomeDir)
}
