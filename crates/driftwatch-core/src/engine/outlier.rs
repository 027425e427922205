use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::stats::percentile;
use crate::{AverageSeries, ChangeSeries, DataError, Symbol, ValidationError};

/// Distance of one symbol's latest change from the latest market average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deviation {
    pub symbol: Symbol,
    pub last_value: f64,
    pub deviation: f64,
}

/// Result of one outlier pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSelection {
    /// `None` when no symbol had a change value to measure.
    pub threshold: Option<f64>,
    /// Every measured symbol, ordered by symbol.
    pub deviations: Vec<Deviation>,
    /// Symbols whose deviation is strictly above the threshold.
    pub retained: Vec<Deviation>,
}

impl OutlierSelection {
    fn unbounded() -> Self {
        Self {
            threshold: None,
            deviations: Vec::new(),
            retained: Vec::new(),
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Deviation> {
        self.deviations
            .iter()
            .find(|deviation| &deviation.symbol == symbol)
    }
}

/// Keeps the symbols that drifted furthest from the market average.
///
/// The threshold is a percentile of the very population being filtered, so
/// on a large enough universe roughly `(100 - P)%` of symbols survive. With
/// two symbols and a high percentile the threshold lands on the larger
/// deviation and nothing is retained.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    percentile: f64,
}

impl OutlierFilter {
    pub fn new(percentile: f64) -> Result<Self, ValidationError> {
        if !percentile.is_finite() || !(0.0..=100.0).contains(&percentile) {
            return Err(ValidationError::InvalidPercentile {
                value: percentile.to_string(),
            });
        }
        Ok(Self { percentile })
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    pub fn select(
        &self,
        series: &BTreeMap<Symbol, ChangeSeries>,
        average: &AverageSeries,
    ) -> Result<OutlierSelection, DataError> {
        let Some(reference) = average.last() else {
            return Ok(OutlierSelection::unbounded());
        };

        let mut deviations = Vec::with_capacity(series.len());
        for (symbol, changes) in series {
            if changes.mode() != average.mode() {
                return Err(DataError::ModeMismatch {
                    expected: average.mode(),
                    found: changes.mode(),
                });
            }
            let Some(last) = changes.last() else {
                continue;
            };

            let deviation = (last.value - reference.value).abs();
            if !deviation.is_finite() {
                return Err(DataError::NonFiniteValue {
                    symbol: symbol.clone(),
                    timestamp: last.timestamp,
                });
            }
            deviations.push(Deviation {
                symbol: symbol.clone(),
                last_value: last.value,
                deviation,
            });
        }

        let values: Vec<f64> = deviations.iter().map(|entry| entry.deviation).collect();
        let Some(threshold) = percentile(&values, self.percentile) else {
            return Ok(OutlierSelection::unbounded());
        };

        let retained = deviations
            .iter()
            .filter(|entry| entry.deviation > threshold)
            .cloned()
            .collect();

        Ok(OutlierSelection {
            threshold: Some(threshold),
            deviations,
            retained,
        })
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self { percentile: 95.0 }
    }
}
