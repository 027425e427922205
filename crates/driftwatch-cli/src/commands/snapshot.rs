use driftwatch_core::{UtcDateTime, Warehouse};

use crate::cli::SnapshotArgs;
use crate::error::CliError;

use super::{engine_config, evaluate, CommandResult};

pub fn run(args: &SnapshotArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let config = engine_config(&args.engine)?;
    let end = match args.end.as_deref() {
        Some(value) => UtcDateTime::parse(value)?,
        None => UtcDateTime::now(),
    };
    let window = config.window_ending_at(end)?;

    evaluate(warehouse, window, &config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use driftwatch_core::{ObservationRecord, WarehouseConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::cli::{Cli, Command};

    fn snapshot_args(extra: &[&str]) -> SnapshotArgs {
        let mut argv = vec!["driftwatch", "snapshot"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("cli").command {
            Command::Snapshot(args) => args,
            _ => panic!("expected snapshot"),
        }
    }

    fn warehouse(dir: &TempDir) -> Warehouse {
        Warehouse::open(WarehouseConfig::with_home(dir.path())).expect("warehouse")
    }

    #[test]
    fn empty_window_is_reported_in_the_envelope() {
        let dir = TempDir::new().expect("tempdir");
        let args = snapshot_args(&["--end", "2024-01-01T01:00:00Z"]);

        let envelope = run(&args, &warehouse(&dir))
            .expect("result")
            .into_envelope()
            .expect("envelope");

        assert_eq!(envelope.errors.len(), 1);
        assert_eq!(envelope.errors[0].code, "empty_input");
        assert_eq!(envelope.data["window"]["start"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn snapshot_over_stored_rows() {
        let dir = TempDir::new().expect("tempdir");
        let warehouse = warehouse(&dir);
        let base = 1_704_067_200_000_i64;
        let rows: Vec<ObservationRecord> = [("AUSDT", [100.0, 102.0, 104.0]), ("BUSDT", [100.0, 99.0, 98.0])]
            .iter()
            .flat_map(|(symbol, prices)| {
                prices.iter().enumerate().map(move |(minute, price)| ObservationRecord {
                    symbol: (*symbol).to_owned(),
                    price: *price,
                    ts_ms: base + minute as i64 * 60_000,
                })
            })
            .collect();
        warehouse
            .ingest_observations("test", "request-0001", &rows)
            .expect("ingest");

        let args = snapshot_args(&["--end", "2024-01-01T00:10:00Z", "--lookback-minutes", "10"]);
        let envelope = run(&args, &warehouse)
            .expect("result")
            .into_envelope()
            .expect("envelope");

        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.data["average"]["points"].as_array().map(Vec::len), Some(2));
        assert_eq!(envelope.data["outliers"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn malformed_end_is_a_validation_error() {
        let dir = TempDir::new().expect("tempdir");
        let args = snapshot_args(&["--end", "yesterday"]);
        let err = run(&args, &warehouse(&dir)).err().expect("must fail");
        assert_eq!(err.exit_code(), 2);
    }
}
