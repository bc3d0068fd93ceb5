//! # Genoflow CLI
//!
//! Command-line entry point.

use clap::Parser;
use genoflow_cli::cli::{Cli, Commands};
use genoflow_cli::commands::{self, EXIT_FAILURE};
use genoflow_cli::logging::init_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }

    info!(version = genoflow::VERSION, "genoflow starting");

    let code = match &cli.command {
        Commands::Run(args) => match commands::run(args).await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Command failed");
                commands::exit_code_for(&e)
            }
        },
    };

    ExitCode::from(code)
}
