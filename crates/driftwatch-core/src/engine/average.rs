use std::collections::BTreeMap;

use crate::engine::stats::mean;
use crate::{AveragePoint, AverageSeries, ChangeMode, ChangeSeries, DataError, Symbol, UtcDateTime};

/// Equal-weighted cross-symbol average of change series.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketAverageAggregator {
    mode: ChangeMode,
}

impl MarketAverageAggregator {
    pub fn new(mode: ChangeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ChangeMode {
        self.mode
    }

    /// Average every timestamp that at least one series has a value for.
    ///
    /// The divisor at each timestamp is the number of contributing symbols.
    /// In cumulative mode the per-timestamp mean growth factor is compounded
    /// from 1, so the result is comparable to each symbol's own index.
    pub fn aggregate(
        &self,
        series: &BTreeMap<Symbol, ChangeSeries>,
    ) -> Result<AverageSeries, DataError> {
        let mut by_timestamp: BTreeMap<UtcDateTime, Vec<f64>> = BTreeMap::new();
        for changes in series.values() {
            if changes.mode() != self.mode {
                return Err(DataError::ModeMismatch {
                    expected: self.mode,
                    found: changes.mode(),
                });
            }
            for point in changes.points() {
                let contribution = match self.mode {
                    ChangeMode::Percentage => point.value,
                    ChangeMode::Cumulative => point.growth,
                };
                by_timestamp
                    .entry(point.timestamp)
                    .or_default()
                    .push(contribution);
            }
        }

        let mut points = Vec::with_capacity(by_timestamp.len());
        let mut index = 1.0_f64;
        for (timestamp, contributions) in by_timestamp {
            let Some(average) = mean(&contributions) else {
                return Err(DataError::NoContributors { timestamp });
            };
            let value = match self.mode {
                ChangeMode::Percentage => average,
                ChangeMode::Cumulative => {
                    index *= average;
                    index
                }
            };
            if !value.is_finite() {
                return Err(DataError::NonFiniteAverage { timestamp });
            }
            points.push(AveragePoint {
                timestamp,
                value,
                contributors: contributions.len(),
            });
        }

        Ok(AverageSeries::new(self.mode, points))
    }
}
