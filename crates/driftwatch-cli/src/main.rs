mod cli;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Command};
use crate::error::{engine_exit_code, CliError};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_tracing() {
    // stdout carries envelopes only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,driftwatch=info,driftwatch_warehouse=info")),
        )
        .init();
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    let warehouse = commands::open_warehouse(cli.db_path.as_deref())?;

    let result = match &cli.command {
        Command::Ingest(args) => commands::ingest::run(args, &warehouse)?,
        Command::Snapshot(args) => commands::snapshot::run(args, &warehouse)?,
        Command::Watch(args) => {
            return commands::watch::run(args, warehouse, cli.format, cli.strict).await;
        }
    };

    let envelope = result.into_envelope()?;
    output::render(&envelope, cli.format, cli.pretty)?;

    if cli.strict && (!envelope.meta.warnings.is_empty() || !envelope.errors.is_empty()) {
        return Err(CliError::StrictModeViolation {
            warning_count: envelope.meta.warnings.len(),
            error_count: envelope.errors.len(),
        });
    }

    if let Some(error) = envelope.errors.first() {
        return Ok(ExitCode::from(engine_exit_code(&error.code)));
    }

    Ok(ExitCode::SUCCESS)
}
