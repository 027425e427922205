//! # Domain Models
//!
//! Canonical types flowing through the driftwatch engine.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated tradable symbol |
//! | [`UtcDateTime`] | UTC timestamp with grid truncation |
//! | [`Resolution`] | Truncation grid (1m, 5m, 15m, 1h) |
//! | [`Observation`] | Raw `(symbol, price, timestamp)` input |
//! | [`TimeWindow`] | Half-open lookback window |
//! | [`ChangeMode`] | Percentage or cumulative change |
//! | [`AlignedSeries`] | One symbol's grid-aligned prices |
//! | [`ChangeSeries`] | One symbol's change values, tagged by mode |
//! | [`AverageSeries`] | Equal-weighted market average, tagged by mode |
//! | [`ScoredSymbol`] | Ranked outlier with display weight |
//!
//! Derived series (`AlignedSeries` onward) are only ever produced by the
//! engine or by validating constructors, so their ordering invariants hold
//! wherever they are observed.

mod observation;
mod resolution;
mod series;
mod symbol;
mod timestamp;

pub use observation::{Observation, TimeWindow};
pub use resolution::Resolution;
pub use series::{
    AlignedPoint, AlignedSeries, AveragePoint, AverageSeries, ChangeMode, ChangePoint,
    ChangeSeries, ScoredSymbol,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
