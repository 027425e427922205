//! Core contracts and engine for driftwatch.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The aggregation & outlier-ranking engine
//! - The observation source seam and its warehouse adapter
//! - Response envelope and structured errors

pub mod domain;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod source;

pub use domain::{
    AlignedPoint, AlignedSeries, AveragePoint, AverageSeries, ChangeMode, ChangePoint,
    ChangeSeries, Observation, Resolution, ScoredSymbol, Symbol, TimeWindow, UtcDateTime,
};
pub use engine::{
    compute, ChangeComputer, Deviation, EngineConfig, HighlightedSeries,
    MarketAverageAggregator, OutlierFilter, OutlierSelection, PerformanceScorer, SeriesAligner,
    Snapshot, WeightCurve,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{DataError, EngineError, SourceError, SourceErrorKind, ValidationError};
pub use driftwatch_warehouse::{
    IngestReport, ObservationRecord, Warehouse, WarehouseConfig, WarehouseError,
};
pub use source::{compute_window, ObservationSource};
