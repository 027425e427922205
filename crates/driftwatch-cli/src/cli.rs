//! CLI argument definitions for driftwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Load NDJSON price observations into the local warehouse |
//! | `snapshot` | Compute one outlier snapshot over a lookback window |
//! | `watch` | Recompute a snapshot on a fixed cadence |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--db-path` | `$DRIFTWATCH_HOME/cache/observations.duckdb` | Warehouse file |
//!
//! # Examples
//!
//! ```bash
//! driftwatch ingest prices.ndjson --source binance
//! driftwatch snapshot --lookback-minutes 120 --percentile 98 --pretty
//! driftwatch watch --mode cumulative --benchmark BTCUSDT --refresh-secs 60
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Market drift monitor: ranks the symbols moving furthest from the market average.
#[derive(Debug, Parser)]
#[command(name = "driftwatch", author, version, about)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Warehouse database file; overrides `DRIFTWATCH_HOME`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output (one line per tick in `watch`).
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load newline-delimited JSON observations into the warehouse.
    ///
    /// Each line is `{"symbol": "...", "price": 1.0, "timestamp": "RFC3339 UTC"}`.
    /// Blank lines are skipped; any malformed line rejects the whole file.
    Ingest(IngestArgs),

    /// Compute one snapshot over `[end - lookback, end)`.
    Snapshot(SnapshotArgs),

    /// Recompute a fresh snapshot every refresh interval until interrupted.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// NDJSON file to load.
    pub file: PathBuf,

    /// Label recorded with every ingested row.
    #[arg(long, default_value = "ndjson")]
    pub source: String,
}

/// Engine parameters shared by `snapshot` and `watch`.
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Length of the lookback window in minutes.
    #[arg(long, default_value_t = 60)]
    pub lookback_minutes: u64,

    /// Timestamp grid (1m, 5m, 15m, 1h).
    #[arg(long, default_value = "1m")]
    pub resolution: String,

    /// Outlier percentile P; symbols strictly above it are kept.
    #[arg(long, default_value_t = 95.0)]
    pub percentile: f64,

    /// Number of recent periods counted by the performance score.
    #[arg(long, default_value_t = 10)]
    pub score_window: usize,

    /// Change mode (percentage, cumulative).
    #[arg(long, default_value = "percentage")]
    pub mode: String,

    /// Weight curve base.
    #[arg(long, default_value_t = 1.3)]
    pub weight_base: f64,

    /// Weight curve scale.
    #[arg(long, default_value_t = 1.0)]
    pub weight_scale: f64,

    /// Weight curve offset.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub weight_offset: f64,

    /// Reference symbol always reported alongside the outliers.
    #[arg(long)]
    pub benchmark: Option<String>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Exclusive window end (RFC3339 UTC); defaults to now.
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Seconds between refreshes.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_secs: u64,

    /// Stop after this many snapshots.
    #[arg(long)]
    pub iterations: Option<u64>,
}
