//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    analysis::{BoundingBox, DatePeriod, OutlierMethod, ResolutionPolicy},
    logging::LogFormat,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Assess weather and climate datasets for analysis readiness
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level, overridden by RUST_LOG when set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Working checklist file
    #[arg(long, global = true)]
    pub checklist: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assess files and directories and write a readiness report
    Report(ReportArgs),
    /// Inspect or edit the readiness checklist
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Data files to assess
    #[arg(long, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Directories to search recursively for data files
    #[arg(long, num_args = 1..)]
    pub dirs: Vec<PathBuf>,

    /// Report path (.json, .csv or .parquet)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Extra strings read as missing in tabular files
    #[arg(long = "null-values", num_args = 1.., allow_negative_numbers = true)]
    pub null_values: Vec<String>,

    #[arg(long)]
    pub outlier_threshold: Option<f64>,

    #[arg(long, value_enum)]
    pub outlier_method: Option<OutlierMethod>,

    #[arg(long, value_enum)]
    pub resolution_policy: Option<ResolutionPolicy>,

    /// Time column of tabular files
    #[arg(long)]
    pub time_column: Option<String>,

    /// MIN_LAT,MAX_LAT,MIN_LON,MAX_LON
    #[arg(long, allow_hyphen_values = true)]
    pub expected_bounds: Option<BoundingBox>,

    /// START,END as YYYY-MM-DD
    #[arg(long)]
    pub expected_period: Option<DatePeriod>,
}

#[derive(Subcommand)]
pub enum ChecklistAction {
    /// Print every section and field
    Show,
    /// Merge a JSON document of section updates into the checklist
    Update { updates: PathBuf },
    /// Restore the checklist from its blank template
    Reset,
    /// Assess one dataset and record the findings
    Fill { file: PathBuf },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_define_a_valid_interface() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_report_options() {
        let cli = Cli::try_parse_from([
            "readiness",
            "report",
            "--dirs",
            "data",
            "--null-values",
            "-999",
            "missing",
            "--outlier-threshold",
            "2.5",
            "--outlier-method",
            "modified-zscore",
            "--expected-bounds",
            "49,61,-8,2",
            "--output",
            "out.csv",
        ])
        .unwrap();

        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.dirs, vec![PathBuf::from("data")]);
        assert_eq!(args.null_values, vec!["-999", "missing"]);
        assert_eq!(args.outlier_threshold, Some(2.5));
        assert_eq!(args.outlier_method, Some(OutlierMethod::ModifiedZscore));
        assert_eq!(args.expected_bounds.map(|b| b.max_lat), Some(61.0));
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn should_parse_checklist_actions() {
        let cli = Cli::try_parse_from([
            "readiness",
            "--checklist",
            "mine.json",
            "checklist",
            "update",
            "updates.json",
        ])
        .unwrap();

        assert_eq!(cli.checklist, Some(PathBuf::from("mine.json")));
        assert!(matches!(
            cli.command,
            Commands::Checklist {
                action: ChecklistAction::Update { .. }
            }
        ));
    }
}
