use crate::{AlignedSeries, ChangeMode, ChangePoint, ChangeSeries, DataError};

/// Turns an aligned price series into a change series of one mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeComputer {
    mode: ChangeMode,
}

impl ChangeComputer {
    pub fn new(mode: ChangeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ChangeMode {
        self.mode
    }

    /// One point per aligned point after the first.
    ///
    /// Fails on a previous price that is zero (or negative) and on any change
    /// that overflows to a non-finite value; nothing partial is returned.
    pub fn compute(&self, series: &AlignedSeries) -> Result<ChangeSeries, DataError> {
        let mut points = Vec::with_capacity(series.len().saturating_sub(1));
        let mut index = 1.0_f64;

        for pair in series.points().windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            if previous.price <= 0.0 {
                return Err(DataError::NonPositivePrice {
                    symbol: series.symbol().clone(),
                    timestamp: current.timestamp,
                    price: previous.price,
                });
            }

            let fraction = (current.price - previous.price) / previous.price;
            let growth = 1.0 + fraction;
            let value = match self.mode {
                ChangeMode::Percentage => fraction * 100.0,
                ChangeMode::Cumulative => {
                    index *= growth;
                    index
                }
            };
            if !value.is_finite() || !growth.is_finite() {
                return Err(DataError::NonFiniteValue {
                    symbol: series.symbol().clone(),
                    timestamp: current.timestamp,
                });
            }

            points.push(ChangePoint {
                timestamp: current.timestamp,
                value,
                growth,
            });
        }

        Ok(ChangeSeries::new(series.symbol().clone(), self.mode, points))
    }
}
