use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use driftwatch_core::{UtcDateTime, Warehouse};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{engine_config, evaluate};

/// Refresh loop: one independent snapshot per tick, ending at the tick time.
///
/// Ticks that fall behind are skipped rather than replayed. Engine failures
/// are printed as error envelopes and the loop keeps going; only `--strict`,
/// Ctrl-C or `--iterations` stop it.
pub async fn run(
    args: &WatchArgs,
    warehouse: Warehouse,
    format: OutputFormat,
    strict: bool,
) -> Result<ExitCode, CliError> {
    run_until(args, warehouse, format, strict, tokio::signal::ctrl_c()).await
}

/// Same loop, stopped by `shutdown` instead of Ctrl-C.
///
/// The shutdown future is created once and stays armed across ticks, so a
/// signal that arrives while a snapshot is being computed is not lost.
async fn run_until<F>(
    args: &WatchArgs,
    warehouse: Warehouse,
    format: OutputFormat,
    strict: bool,
    shutdown: F,
) -> Result<ExitCode, CliError>
where
    F: Future,
{
    let config = engine_config(&args.engine)?;
    let mut ticker = interval(Duration::from_secs(args.refresh_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut completed: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!(completed, "interrupted, stopping watch");
                break;
            }
        }

        let window = config.window_ending_at(UtcDateTime::now())?;
        let source = warehouse.clone();
        let tick_config = config.clone();
        let task = tokio::task::spawn_blocking(move || evaluate(&source, window, &tick_config));
        let result = tokio::select! {
            joined = task => joined
                .map_err(|error| CliError::Command(format!("snapshot task failed: {error}")))??,
            _ = &mut shutdown => {
                info!(completed, "interrupted during snapshot, stopping watch");
                break;
            }
        };

        let envelope = result.into_envelope()?;
        output::render(&envelope, format, false)?;
        debug!(
            request_id = %envelope.meta.request_id,
            errors = envelope.errors.len(),
            "watch tick rendered"
        );

        if strict && (!envelope.meta.warnings.is_empty() || !envelope.errors.is_empty()) {
            return Err(CliError::StrictModeViolation {
                warning_count: envelope.meta.warnings.len(),
                error_count: envelope.errors.len(),
            });
        }

        completed += 1;
        if args.iterations.is_some_and(|limit| completed >= limit) {
            break;
        }
    }

    Ok(ExitCode::SUCCESS)
}
