use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// How consecutive prices are turned into a change series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMode {
    /// `(p[i] - p[i-1]) / p[i-1] * 100` per period.
    #[default]
    Percentage,
    /// Compounded growth index seeded at 1.
    Cumulative,
}

impl ChangeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Cumulative => "cumulative",
        }
    }
}

impl Display for ChangeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percentage" | "pct" => Ok(Self::Percentage),
            "cumulative" | "cum" => Ok(Self::Cumulative),
            other => Err(ValidationError::InvalidChangeMode {
                value: other.to_owned(),
            }),
        }
    }
}

/// A price sitting on the resolution grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedPoint {
    pub timestamp: UtcDateTime,
    pub price: f64,
}

/// One symbol's prices, strictly increasing in timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    symbol: Symbol,
    points: Vec<AlignedPoint>,
}

impl AlignedSeries {
    pub fn new(symbol: Symbol, points: Vec<AlignedPoint>) -> Result<Self, ValidationError> {
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err(ValidationError::UnorderedSeries {
                symbol: symbol.to_string(),
                index: index + 1,
            });
        }
        Ok(Self { symbol, points })
    }

    /// Caller guarantees strictly increasing timestamps.
    pub(crate) fn from_sorted(symbol: Symbol, points: Vec<AlignedPoint>) -> Self {
        debug_assert!(points.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
        Self { symbol, points }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[AlignedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Change at one timestamp.
///
/// `value` is the mode's figure (percentage or growth index); `growth` is the
/// period's factor `1 + (p[i] - p[i-1]) / p[i-1]` regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangePoint {
    pub timestamp: UtcDateTime,
    pub value: f64,
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSeries {
    symbol: Symbol,
    mode: ChangeMode,
    points: Vec<ChangePoint>,
}

impl ChangeSeries {
    pub(crate) fn new(symbol: Symbol, mode: ChangeMode, points: Vec<ChangePoint>) -> Self {
        Self {
            symbol,
            mode,
            points,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn mode(&self) -> ChangeMode {
        self.mode
    }

    pub fn points(&self) -> &[ChangePoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&ChangePoint> {
        self.points.last()
    }

    /// The most recent `count` points (fewer if the series is shorter).
    pub fn tail(&self, count: usize) -> &[ChangePoint] {
        let start = self.points.len().saturating_sub(count);
        &self.points[start..]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Equal-weighted market average at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AveragePoint {
    pub timestamp: UtcDateTime,
    pub value: f64,
    pub contributors: usize,
}

/// Market average, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageSeries {
    mode: ChangeMode,
    points: Vec<AveragePoint>,
}

impl AverageSeries {
    pub(crate) fn new(mode: ChangeMode, points: Vec<AveragePoint>) -> Self {
        Self { mode, points }
    }

    pub fn mode(&self) -> ChangeMode {
        self.mode
    }

    pub fn points(&self) -> &[AveragePoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&AveragePoint> {
        self.points.last()
    }

    pub fn value_at(&self, timestamp: UtcDateTime) -> Option<f64> {
        self.points
            .binary_search_by_key(&timestamp, |point| point.timestamp)
            .ok()
            .map(|index| self.points[index].value)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A symbol picked for display, with its emphasis weight and rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSymbol {
    pub symbol: Symbol,
    /// Periods in the scoring window where the symbol beat the average.
    pub score: usize,
    /// Display emphasis, always >= 1.
    pub weight: f64,
    /// 1-based; 0 until ranked.
    pub rank: usize,
    pub last_value: f64,
    pub deviation: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub benchmark: bool,
}
