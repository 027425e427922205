use std::cmp::Ordering;

use serde::Serialize;

use crate::engine::outlier::Deviation;
use crate::{AverageSeries, ChangeSeries, DataError, ScoredSymbol, ValidationError};

/// Maps a performance score to a display weight.
///
/// `weight(score) = max(1, offset + scale * base^score)`. With `base >= 1` and
/// `scale > 0` the weight never decreases as the score grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightCurve {
    base: f64,
    scale: f64,
    offset: f64,
}

impl WeightCurve {
    pub fn new(base: f64, scale: f64, offset: f64) -> Result<Self, ValidationError> {
        let finite = base.is_finite() && scale.is_finite() && offset.is_finite();
        if !finite || base < 1.0 || scale <= 0.0 {
            return Err(ValidationError::InvalidWeightCurve);
        }
        Ok(Self {
            base,
            scale,
            offset,
        })
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn weight(&self, score: usize) -> f64 {
        let exponent = i32::try_from(score).unwrap_or(i32::MAX);
        let raw = self.offset + self.scale * self.base.powi(exponent);
        if raw.is_finite() {
            raw.max(1.0)
        } else {
            f64::MAX
        }
    }
}

impl Default for WeightCurve {
    fn default() -> Self {
        Self {
            base: 1.3,
            scale: 1.0,
            offset: 1.0,
        }
    }
}

/// Counts recent out-performance against the market average.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceScorer {
    window: usize,
    curve: WeightCurve,
}

impl PerformanceScorer {
    pub fn new(window: usize, curve: WeightCurve) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::InvalidScoreWindow);
        }
        Ok(Self { window, curve })
    }

    pub fn with_curve(self, curve: WeightCurve) -> Self {
        Self { curve, ..self }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn curve(&self) -> WeightCurve {
        self.curve
    }

    /// Number of the last `window` points strictly above the average at the
    /// same timestamp.
    pub fn score(&self, changes: &ChangeSeries, average: &AverageSeries) -> Result<usize, DataError> {
        if changes.mode() != average.mode() {
            return Err(DataError::ModeMismatch {
                expected: average.mode(),
                found: changes.mode(),
            });
        }

        Ok(changes
            .tail(self.window)
            .iter()
            .filter(|point| {
                average
                    .value_at(point.timestamp)
                    .is_some_and(|reference| point.value > reference)
            })
            .count())
    }

    /// Score a measured symbol; the result is unranked until [`Self::rank`].
    pub fn scored(
        &self,
        deviation: &Deviation,
        changes: &ChangeSeries,
        average: &AverageSeries,
    ) -> Result<ScoredSymbol, DataError> {
        let score = self.score(changes, average)?;
        Ok(ScoredSymbol {
            symbol: deviation.symbol.clone(),
            score,
            weight: self.curve.weight(score),
            rank: 0,
            last_value: deviation.last_value,
            deviation: deviation.deviation,
            benchmark: false,
        })
    }

    /// Order by `(weight, symbol)` descending and assign 1-based ranks.
    pub fn rank(&self, mut scored: Vec<ScoredSymbol>) -> Vec<ScoredSymbol> {
        scored.sort_by(ranking_order);
        for (index, entry) in scored.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
        scored
    }
}

impl Default for PerformanceScorer {
    fn default() -> Self {
        Self {
            window: 10,
            curve: WeightCurve::default(),
        }
    }
}

fn ranking_order(left: &ScoredSymbol, right: &ScoredSymbol) -> Ordering {
    right
        .weight
        .total_cmp(&left.weight)
        .then_with(|| right.symbol.cmp(&left.symbol))
}
