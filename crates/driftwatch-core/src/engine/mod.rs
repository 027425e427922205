//! # Aggregation & Outlier-Ranking Engine
//!
//! Pure pipeline over one bounded batch of observations:
//!
//! | Stage | Type | Output |
//! |-------|------|--------|
//! | 1 | [`SeriesAligner`] | symbol -> [`AlignedSeries`] |
//! | 2 | [`ChangeComputer`] | symbol -> [`ChangeSeries`] |
//! | 3 | [`MarketAverageAggregator`] | one [`AverageSeries`] |
//! | 4 | [`OutlierFilter`] | threshold and retained symbols |
//! | 5 | [`PerformanceScorer`] | ranked [`ScoredSymbol`]s |
//!
//! Every stage builds a fresh collection from the previous one; nothing is
//! shared between invocations, so snapshots over overlapping windows can be
//! computed concurrently.
//!
//! [`AlignedSeries`]: crate::AlignedSeries

mod aligner;
mod average;
mod change;
mod outlier;
mod scorer;
mod stats;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

pub use aligner::SeriesAligner;
pub use average::MarketAverageAggregator;
pub use change::ChangeComputer;
pub use outlier::{Deviation, OutlierFilter, OutlierSelection};
pub use scorer::{PerformanceScorer, WeightCurve};
pub use stats::{mean, percentile};

use crate::{
    AverageSeries, ChangeMode, ChangePoint, ChangeSeries, EngineError, Observation, Resolution,
    ScoredSymbol, Symbol, TimeWindow, UtcDateTime, ValidationError,
};

const DEFAULT_LOOKBACK: Duration = Duration::from_secs(60 * 60);

/// Parameters for one engine run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    lookback: Duration,
    resolution: Resolution,
    mode: ChangeMode,
    filter: OutlierFilter,
    scorer: PerformanceScorer,
    benchmark: Option<Symbol>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            resolution: Resolution::default(),
            mode: ChangeMode::default(),
            filter: OutlierFilter::default(),
            scorer: PerformanceScorer::default(),
            benchmark: None,
        }
    }
}

impl EngineConfig {
    pub fn with_lookback(mut self, lookback: Duration) -> Result<Self, ValidationError> {
        if lookback.is_zero() {
            return Err(ValidationError::InvalidLookback);
        }
        self.lookback = lookback;
        Ok(self)
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_mode(mut self, mode: ChangeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_percentile(mut self, percentile: f64) -> Result<Self, ValidationError> {
        self.filter = OutlierFilter::new(percentile)?;
        Ok(self)
    }

    pub fn with_score_window(mut self, window: usize) -> Result<Self, ValidationError> {
        self.scorer = PerformanceScorer::new(window, self.scorer.curve())?;
        Ok(self)
    }

    pub fn with_weight_curve(mut self, curve: WeightCurve) -> Self {
        self.scorer = self.scorer.with_curve(curve);
        self
    }

    pub fn with_benchmark(mut self, benchmark: Option<Symbol>) -> Self {
        self.benchmark = benchmark;
        self
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn mode(&self) -> ChangeMode {
        self.mode
    }

    pub fn percentile(&self) -> f64 {
        self.filter.percentile()
    }

    pub fn score_window(&self) -> usize {
        self.scorer.window()
    }

    pub fn weight_curve(&self) -> WeightCurve {
        self.scorer.curve()
    }

    pub fn benchmark(&self) -> Option<&Symbol> {
        self.benchmark.as_ref()
    }

    /// The lookback window ending (exclusively) at `end`.
    pub fn window_ending_at(&self, end: UtcDateTime) -> Result<TimeWindow, ValidationError> {
        TimeWindow::ending_at(end, self.lookback)
    }
}

/// A scored symbol together with the change points a sink would draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedSeries {
    #[serde(flatten)]
    pub scored: ScoredSymbol,
    pub points: Vec<ChangePoint>,
}

/// Everything one refresh cycle hands to a render sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    pub mode: ChangeMode,
    pub resolution: Resolution,
    pub percentile: f64,
    pub score_window: usize,
    pub weight_curve: WeightCurve,
    /// Per-symbol change series; symbols with fewer than two aligned points
    /// are left out.
    #[serde(skip)]
    pub series: BTreeMap<Symbol, ChangeSeries>,
    pub average: AverageSeries,
    pub threshold: Option<f64>,
    /// Ranked outliers, best weight first.
    pub outliers: Vec<ScoredSymbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<ScoredSymbol>,
    /// Outliers in rank order followed by the benchmark when it is not
    /// itself an outlier.
    pub highlighted: Vec<HighlightedSeries>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }
}

/// Run the full pipeline over `observations`.
///
/// Fails with [`EngineError::EmptyInput`] when there is nothing to align and
/// with [`EngineError::Data`] on the first malformed value; no partial
/// snapshot is produced in either case.
pub fn compute(
    observations: Vec<Observation>,
    config: &EngineConfig,
) -> Result<Snapshot, EngineError> {
    let aligned = SeriesAligner::new(config.resolution).align(observations)?;

    let computer = ChangeComputer::new(config.mode);
    let mut series = BTreeMap::new();
    for (symbol, prices) in &aligned {
        let changes = computer.compute(prices)?;
        if !changes.is_empty() {
            series.insert(symbol.clone(), changes);
        }
    }
    debug!(
        symbols = aligned.len(),
        with_changes = series.len(),
        mode = %config.mode,
        "computed change series"
    );

    let average = MarketAverageAggregator::new(config.mode).aggregate(&series)?;
    debug!(points = average.len(), "aggregated market average");

    let selection = config.filter.select(&series, &average)?;
    debug!(
        measured = selection.deviations.len(),
        retained = selection.retained.len(),
        threshold = ?selection.threshold,
        "filtered outliers"
    );

    let mut warnings = Vec::new();
    if selection.threshold.is_none() {
        warn!("no symbol has enough aligned points to measure deviation");
        warnings.push(String::from(
            "no symbol has at least two aligned points; outlier threshold is unbounded",
        ));
    }

    let mut scored = Vec::with_capacity(selection.retained.len());
    for deviation in &selection.retained {
        if let Some(changes) = series.get(&deviation.symbol) {
            scored.push(config.scorer.scored(deviation, changes, &average)?);
        }
    }
    let mut outliers = config.scorer.rank(scored);

    let mut benchmark = None;
    if let Some(symbol) = &config.benchmark {
        match (selection.get(symbol), series.get(symbol)) {
            (Some(deviation), Some(changes)) => {
                let mut entry = config.scorer.scored(deviation, changes, &average)?;
                entry.benchmark = true;
                if let Some(ranked) = outliers.iter_mut().find(|item| &item.symbol == symbol) {
                    ranked.benchmark = true;
                    entry.rank = ranked.rank;
                }
                benchmark = Some(entry);
            }
            _ => {
                warn!(benchmark = %symbol, "benchmark has no change values in window");
                warnings.push(format!("benchmark {symbol} has no change values in window"));
            }
        }
    }

    let highlighted = outliers
        .iter()
        .chain(benchmark.iter().filter(|entry| entry.rank == 0))
        .filter_map(|entry| {
            series.get(&entry.symbol).map(|changes| HighlightedSeries {
                scored: entry.clone(),
                points: changes.points().to_vec(),
            })
        })
        .collect();

    Ok(Snapshot {
        window: None,
        mode: config.mode,
        resolution: config.resolution,
        percentile: config.percentile(),
        score_window: config.score_window(),
        weight_curve: config.weight_curve(),
        series,
        average,
        threshold: selection.threshold,
        outliers,
        benchmark,
        highlighted,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(symbol: &str, price: f64, minute: i64) -> Observation {
        Observation::new(
            Symbol::parse(symbol).expect("symbol"),
            price,
            UtcDateTime::from_unix_millis(minute * 60_000).expect("timestamp"),
        )
        .expect("observation")
    }

    fn universe() -> Vec<Observation> {
        let mut observations = Vec::new();
        for index in 0..20_i64 {
            let symbol = format!("S{index:02}");
            let drift = (index * index) as f64 * 0.01;
            for minute in 0..5 {
                let price = 100.0 * (1.0 + drift / 100.0).powi(minute as i32);
                observations.push(observation(&symbol, price, minute));
            }
        }
        observations
    }

    #[test]
    fn config_builders_validate() {
        let config = EngineConfig::default();
        assert!(config.clone().with_percentile(101.0).is_err());
        assert!(config.clone().with_score_window(0).is_err());
        assert!(config.clone().with_lookback(Duration::ZERO).is_err());

        let tuned = config
            .with_percentile(98.0)
            .and_then(|config| config.with_score_window(15))
            .expect("config");
        assert_eq!(tuned.percentile(), 98.0);
        assert_eq!(tuned.score_window(), 15);
        assert_eq!(tuned.weight_curve(), WeightCurve::default());
    }

    #[test]
    fn single_point_symbols_are_excluded() {
        let snapshot = compute(
            vec![
                observation("AUSDT", 1.0, 0),
                observation("AUSDT", 2.0, 1),
                observation("BUSDT", 5.0, 0),
            ],
            &EngineConfig::default(),
        )
        .expect("snapshot");

        assert_eq!(snapshot.symbol_count(), 1);
        assert_eq!(snapshot.average.points()[0].contributors, 1);
    }

    #[test]
    fn only_single_points_yield_an_unbounded_threshold() {
        let snapshot = compute(
            vec![observation("AUSDT", 1.0, 0), observation("BUSDT", 5.0, 0)],
            &EngineConfig::default(),
        )
        .expect("snapshot");

        assert_eq!(snapshot.threshold, None);
        assert!(snapshot.outliers.is_empty());
        assert!(snapshot.average.is_empty());
        assert_eq!(snapshot.warnings.len(), 1);
    }

    #[test]
    fn outliers_are_ranked_and_highlighted() {
        let snapshot = compute(universe(), &EngineConfig::default()).expect("snapshot");

        assert_eq!(snapshot.outliers.len(), 1);
        let top = &snapshot.outliers[0];
        assert_eq!(top.symbol.as_str(), "S19");
        assert_eq!(top.rank, 1);
        assert_eq!(top.score, 4);
        assert_eq!(top.weight, WeightCurve::default().weight(4));
        assert_eq!(snapshot.highlighted.len(), 1);
        assert_eq!(snapshot.highlighted[0].points.len(), 4);
    }

    #[test]
    fn benchmark_is_reported_even_when_not_an_outlier() {
        let config = EngineConfig::default()
            .with_benchmark(Some(Symbol::parse("S15").expect("symbol")));
        let snapshot = compute(universe(), &config).expect("snapshot");

        let benchmark = snapshot.benchmark.as_ref().expect("benchmark");
        assert!(benchmark.benchmark);
        assert_eq!(benchmark.rank, 0);
        assert_eq!(benchmark.score, 4);
        assert_eq!(snapshot.highlighted.len(), 2);
        assert_eq!(snapshot.highlighted[1].scored.symbol.as_str(), "S15");
    }

    #[test]
    fn missing_benchmark_is_a_warning() {
        let config = EngineConfig::default()
            .with_benchmark(Some(Symbol::parse("BTCUSDT").expect("symbol")));
        let snapshot = compute(universe(), &config).expect("snapshot");

        assert!(snapshot.benchmark.is_none());
        assert_eq!(snapshot.warnings, ["benchmark BTCUSDT has no change values in window"]);
    }

    #[test]
    fn snapshot_serializes_without_raw_series() {
        let snapshot = compute(universe(), &EngineConfig::default()).expect("snapshot");
        let value = serde_json::to_value(&snapshot).expect("json");

        assert!(value.get("series").is_none());
        assert_eq!(value["mode"], "percentage");
        assert_eq!(value["resolution"], "1m");
        assert_eq!(value["outliers"][0]["symbol"], "S19");
        assert_eq!(value["highlighted"][0]["rank"], 1);
        assert!(value.get("warnings").is_none());
    }
}
