/*
 * Responsibility
 * - parse the command line and start the selected role
 * - a fatal bootstrap error is logged and the process exits with status 1
 */
use std::process::ExitCode;

use clap::Parser;

use taskgate::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            // Logging may not be initialised yet (configuration errors).
            eprintln!("taskgate: {e:#}");
            ExitCode::FAILURE
        }
    }
}
