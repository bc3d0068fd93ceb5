//! Command implementations.

use crate::cli::RunArgs;
use anyhow::{Context, Result};
use genoflow::cancellation::CancellationToken;
use genoflow::errors::{ConfigError, GenoflowError};
use genoflow::events::LoggingEventSink;
use genoflow::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Every discovered sample completed.
pub const EXIT_SUCCESS: u8 = 0;
/// At least one sample failed or is partial, or the run was aborted.
pub const EXIT_FAILURE: u8 = 1;
/// The configuration or the installed tools are unusable.
pub const EXIT_CONFIGURATION: u8 = 2;

const VERSION_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Maps an error escaping a command to the process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let configuration = err
        .downcast_ref::<GenoflowError>()
        .is_some_and(GenoflowError::is_configuration)
        || err.downcast_ref::<ConfigError>().is_some();
    if configuration {
        EXIT_CONFIGURATION
    } else {
        EXIT_FAILURE
    }
}

/// Runs the `run` command and returns the exit code.
pub async fn run(args: &RunArgs) -> Result<u8> {
    let config = args.resolve_config()?;
    let orchestrator =
        Orchestrator::new(config).with_event_sink(Arc::new(LoggingEventSink::default()));

    if args.check {
        return check(&orchestrator).await;
    }

    let input = args.input.as_deref().context("--input is required")?;
    let output = args.output.as_deref().context("--output is required")?;

    let interrupt = tokio::spawn(cancel_on_signal(orchestrator.cancel_token()));
    let result = orchestrator.run(input, output).await;
    interrupt.abort();

    let summary = result?;
    if let Some(reason) = &summary.aborted {
        error!(error = %GenoflowError::RunAborted(reason.clone()), "Run did not finish");
    }
    info!(
        run_id = %summary.run_id,
        exit_code = summary.exit_code(),
        "Done"
    );
    Ok(u8::try_from(summary.exit_code()).unwrap_or(EXIT_FAILURE))
}

/// Prints the dependency report and returns the exit code.
async fn check(orchestrator: &Orchestrator) -> Result<u8> {
    let mut report = orchestrator.check_dependencies()?;
    report.query_versions(VERSION_QUERY_TIMEOUT).await;
    print!("{report}");

    if report.is_satisfied() {
        info!("All required tools found");
        Ok(EXIT_SUCCESS)
    } else {
        let missing: Vec<&str> = report.failures().map(|c| c.tool.as_str()).collect();
        error!(?missing, "Required tools are missing or not executable");
        Ok(EXIT_CONFIGURATION)
    }
}

/// Cancels the run on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: Arc<CancellationToken>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    warn!("Received interrupt, aborting run");
    cancel.cancel("operator interrupt");
}
