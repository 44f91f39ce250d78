mod analysis;
mod checklist;
mod cli;
mod config;
mod dataset;
mod error;
mod loader;
mod logging;
mod pipeline;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::{command, Cli, Commands};
use config::Config;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init(&cli.log_level, cli.log_format)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.checklist {
        config.checklist.path = path;
    }

    match &cli.command {
        Commands::Report(args) => {
            let filename = command::report(args, config)?;
            println!("Report saved to `{}`", filename);
        }
        Commands::Checklist { action } => {
            let message = command::checklist(action, &config)?;
            println!("{}", message.trim_end());
        }
    }

    Ok(())
}
