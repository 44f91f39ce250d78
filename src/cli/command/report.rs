use anyhow::Result;

use crate::{
    cli::{create_progress_bar, ReportArgs},
    config::Config,
    pipeline::{collect_inputs, run_batch},
    report::{write_report, SinkFormat},
};

use super::make_report_file_name;

/// Assesses every input and writes the batch report. Returns the report path.
///
/// Configuration, output sink and inputs are all checked before the first
/// file is opened.
pub fn report(args: &ReportArgs, config: Config) -> Result<String> {
    let config = apply_overrides(config, args);
    config.validate()?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => make_report_file_name()?,
    };
    let sink = SinkFormat::from_path(&output)?;
    let inputs = collect_inputs(&args.files, &args.dirs)?;

    let bar = create_progress_bar(inputs.len() as u64, "Assessing inputs".to_string());
    let batch = run_batch(&inputs, &config, &bar);
    bar.finish_with_message(format!(
        "{} of {} inputs assessed",
        batch.processed, batch.attempted
    ));

    write_report(&batch, &output, sink)?;

    Ok(output.to_string_lossy().to_string())
}

/// Command-line values win over the configuration file.
fn apply_overrides(mut config: Config, args: &ReportArgs) -> Config {
    if !args.null_values.is_empty() {
        config.null_markers = args.null_values.clone();
    }
    if let Some(threshold) = args.outlier_threshold {
        config.outlier_threshold = threshold;
    }
    if let Some(method) = args.outlier_method {
        config.outlier_method = method;
    }
    if let Some(policy) = args.resolution_policy {
        config.resolution_policy = policy;
    }
    if let Some(column) = &args.time_column {
        config.time_column = column.clone();
    }
    if args.expected_bounds.is_some() {
        config.expected_bounds = args.expected_bounds;
    }
    if args.expected_period.is_some() {
        config.expected_period = args.expected_period;
    }
    config
}

// -- Tests -------------------------------------------------------------------
