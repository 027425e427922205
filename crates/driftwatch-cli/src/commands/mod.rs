pub mod ingest;
pub mod snapshot;
pub mod watch;

use std::path::Path;
use std::time::{Duration, Instant};

use driftwatch_core::{
    compute_window, ChangeMode, EngineConfig, Envelope, EnvelopeError, EnvelopeMeta, Resolution,
    Symbol, TimeWindow, Warehouse, WarehouseConfig, WeightCurve, SCHEMA_VERSION,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::cli::EngineArgs;
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn into_envelope(self) -> Result<Envelope<Value>, CliError> {
        let Self {
            data,
            warnings,
            errors,
            latency_ms,
        } = self;

        let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), SCHEMA_VERSION, latency_ms)?;
        for warning in warnings {
            meta.push_warning(warning);
        }

        Envelope::with_errors(meta, data, errors).map_err(CliError::from)
    }
}

pub fn open_warehouse(db_path: Option<&Path>) -> Result<Warehouse, CliError> {
    let mut config = WarehouseConfig::default();
    if let Some(path) = db_path {
        config.db_path = path.to_path_buf();
    }
    Warehouse::open(config).map_err(CliError::from)
}

pub fn engine_config(args: &EngineArgs) -> Result<EngineConfig, CliError> {
    let resolution: Resolution = args.resolution.parse()?;
    let mode: ChangeMode = args.mode.parse()?;
    let curve = WeightCurve::new(args.weight_base, args.weight_scale, args.weight_offset)?;
    let benchmark = args
        .benchmark
        .as_deref()
        .map(Symbol::parse)
        .transpose()?;

    let config = EngineConfig::default()
        .with_lookback(Duration::from_secs(args.lookback_minutes.saturating_mul(60)))?
        .with_percentile(args.percentile)?
        .with_score_window(args.score_window)?
        .with_resolution(resolution)
        .with_mode(mode)
        .with_weight_curve(curve)
        .with_benchmark(benchmark);
    Ok(config)
}

/// Compute one snapshot and package it for an envelope.
///
/// Engine failures become envelope errors rather than `Err`, so a sink always
/// receives a typed reason for an empty refresh.
pub fn evaluate(
    warehouse: &Warehouse,
    window: TimeWindow,
    config: &EngineConfig,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let result = match compute_window(warehouse, window, config) {
        Ok(snapshot) => {
            let warnings = snapshot.warnings.clone();
            CommandResult::ok(serde_json::to_value(&snapshot)?).with_warnings(warnings)
        }
        Err(error) => {
            warn!(code = error.code(), %error, "snapshot failed");
            CommandResult::ok(json!({ "window": window }))
                .with_errors(vec![EnvelopeError::from(&error)])
        }
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(result.with_latency(latency_ms))
}
