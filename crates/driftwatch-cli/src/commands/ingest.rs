use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Instant;

use driftwatch_core::{Observation, ObservationRecord, Warehouse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &IngestArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let file = File::open(&args.file)?;
    let records = parse_observations(BufReader::new(file))?;

    let request_id = Uuid::new_v4().to_string();
    let report = warehouse.ingest_observations(&args.source, &request_id, &records)?;
    let stored = warehouse.observation_count()?;
    info!(
        file = %args.file.display(),
        inserted = report.inserted,
        stored,
        "ingest complete"
    );

    let mut result = CommandResult::ok(json!({
        "request_id": report.request_id,
        "source": report.source,
        "inserted": report.inserted,
        "stored": stored,
        "db_path": warehouse.db_path().display().to_string(),
    }));
    if records.is_empty() {
        result = result.with_warning(format!("no observations found in {}", args.file.display()));
    }

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(result.with_latency(latency_ms))
}

/// Parse NDJSON observations, skipping blank lines. Line numbers are 1-based.
fn parse_observations(reader: impl BufRead) -> Result<Vec<ObservationRecord>, CliError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let observation: Observation =
            serde_json::from_str(trimmed).map_err(|error| CliError::Input {
                line: index + 1,
                reason: error.to_string(),
            })?;

        records.push(ObservationRecord {
            symbol: observation.symbol.to_string(),
            price: observation.price,
            ts_ms: observation.timestamp.unix_millis(),
        });
    }
    Ok(records)
}
