//! # Driftwatch Warehouse
//!
//! DuckDB-backed store for raw price observations.
//!
//! Observations are append-only. Every row gets a monotonically increasing
//! `seq` at insert time, so a window read ordered by `(ts, seq)` reproduces
//! arrival order for rows sharing a timestamp.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `observations` | Raw `(symbol, price, ts)` rows with arrival sequence |
//! | `ingest_log` | One row per ingested batch |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driftwatch_warehouse::{ObservationRecord, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     warehouse.ingest_observations(
//!         "binance",
//!         "req-0001",
//!         &[ObservationRecord {
//!             symbol: "BTCUSDT".to_string(),
//!             price: 64_250.5,
//!             ts_ms: 1_760_000_000_000,
//!         }],
//!     )?;
//!
//!     let rows = warehouse.fetch_observations(1_759_999_940_000, 1_760_000_060_000)?;
//!     println!("{} rows in window", rows.len());
//!     Ok(())
//! }
//! ```

pub mod migrations;
pub mod pool;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::ToSql;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub use pool::{AccessMode, ConnectionPool, Lease};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the database location.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Request was rejected before reaching the database.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// A record failed basic sanity checks.
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Configuration for the observation store.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for driftwatch data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum idle connections kept per access lane.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::with_home(resolve_driftwatch_home())
    }
}

impl WarehouseConfig {
    /// Config rooted at `home`, with the database in `<home>/cache`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("cache").join("observations.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// One stored price observation. Timestamps are Unix epoch milliseconds (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationRecord {
    pub symbol: String,
    pub price: f64,
    pub ts_ms: i64,
}

/// Outcome of an ingest call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub request_id: String,
    pub source: String,
    pub inserted: usize,
}

/// The observation store handle. Clones share one connection pool.
#[derive(Clone)]
pub struct Warehouse {
    pool: ConnectionPool,
}

impl Warehouse {
    /// Open the warehouse at the default location.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the warehouse described by `config`.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.lease(AccessMode::ReadWrite)?;
        let applied = migrations::apply_migrations(&connection)?;
        debug!(
            db_path = %self.db_path().display(),
            applied,
            "warehouse schema ready"
        );
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Append observations in a single transaction.
    ///
    /// Rows are written in slice order, which becomes their arrival order.
    /// An empty slice is a no-op.
    pub fn ingest_observations(
        &self,
        source: &str,
        request_id: &str,
        rows: &[ObservationRecord],
    ) -> Result<IngestReport, WarehouseError> {
        let mut report = IngestReport {
            request_id: request_id.to_owned(),
            source: source.to_owned(),
            inserted: 0,
        };
        if rows.is_empty() {
            return Ok(report);
        }

        for (index, row) in rows.iter().enumerate() {
            if row.symbol.trim().is_empty() {
                return Err(WarehouseError::InvalidRecord {
                    index,
                    reason: String::from("symbol is empty"),
                });
            }
            if !row.price.is_finite() {
                return Err(WarehouseError::InvalidRecord {
                    index,
                    reason: String::from("price is not finite"),
                });
            }
            if row.price < 0.0 {
                return Err(WarehouseError::InvalidRecord {
                    index,
                    reason: String::from("price is negative"),
                });
            }
        }

        let connection = self.pool.lease(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut statement = connection.prepare(
                "INSERT INTO observations (symbol, price, ts, source) \
                 VALUES (?, ?, epoch_ms(CAST(? AS BIGINT)), ?)",
            )?;
            for row in rows {
                let params: [&dyn ToSql; 4] = [&row.symbol, &row.price, &row.ts_ms, &source];
                statement.execute(params.as_slice())?;
            }

            let row_count = rows.len() as i64;
            let params: [&dyn ToSql; 3] = [&request_id, &source, &row_count];
            connection.execute(
                "INSERT INTO ingest_log (request_id, source, row_count, status, timestamp) \
                 VALUES (?, ?, ?, 'ok', CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            Ok(rows.len())
        })();

        report.inserted = finalize_transaction(&connection, result)?;
        info!(
            source,
            request_id,
            inserted = report.inserted,
            "observations ingested"
        );
        Ok(report)
    }

    /// Observations with `start_ms <= ts < end_ms`, ordered by timestamp and
    /// then arrival.
    pub fn fetch_observations(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ObservationRecord>, WarehouseError> {
        if start_ms >= end_ms {
            return Err(WarehouseError::QueryRejected(format!(
                "window start {start_ms} must be before end {end_ms}"
            )));
        }

        let connection = self.pool.lease(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT symbol, price, epoch_ms(ts) AS ts_ms \
             FROM observations \
             WHERE ts >= epoch_ms(CAST(? AS BIGINT)) AND ts < epoch_ms(CAST(? AS BIGINT)) \
             ORDER BY ts, seq",
        )?;
        let params: [&dyn ToSql; 2] = [&start_ms, &end_ms];
        let rows = statement
            .query_map(params.as_slice(), |row| {
                Ok(ObservationRecord {
                    symbol: row.get(0)?,
                    price: row.get(1)?,
                    ts_ms: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(start_ms, end_ms, rows = rows.len(), "observation window fetched");
        Ok(rows)
    }

    /// Total number of stored observations.
    pub fn observation_count(&self) -> Result<u64, WarehouseError> {
        let connection = self.pool.lease(AccessMode::ReadOnly)?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn finalize_transaction<T>(
    connection: &::duckdb::Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_driftwatch_home() -> PathBuf {
    if let Some(path) = env::var_os("DRIFTWATCH_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".driftwatch");
    }

    PathBuf::from(".driftwatch")
}
