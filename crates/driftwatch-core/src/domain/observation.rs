use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Raw price observation as published into storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedObservation")]
pub struct Observation {
    pub symbol: Symbol,
    pub price: f64,
    pub timestamp: UtcDateTime,
}

impl Observation {
    /// Build an observation, rejecting non-finite and negative prices.
    ///
    /// Zero is accepted here; the change computation reports it as a data
    /// error when it is used as a previous price.
    pub fn new(symbol: Symbol, price: f64, timestamp: UtcDateTime) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if price < 0.0 {
            return Err(ValidationError::NegativeValue { field: "price" });
        }

        Ok(Self {
            symbol,
            price,
            timestamp,
        })
    }
}

#[derive(Deserialize)]
struct UncheckedObservation {
    symbol: Symbol,
    price: f64,
    timestamp: UtcDateTime,
}

impl TryFrom<UncheckedObservation> for Observation {
    type Error = ValidationError;

    fn try_from(value: UncheckedObservation) -> Result<Self, Self::Error> {
        Self::new(value.symbol, value.price, value.timestamp)
    }
}

/// Half-open lookback window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl TimeWindow {
    pub fn new(start: UtcDateTime, end: UtcDateTime) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidWindow {
                start: start.format_rfc3339(),
                end: end.format_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The window of length `lookback` that ends (exclusively) at `end`.
    pub fn ending_at(end: UtcDateTime, lookback: Duration) -> Result<Self, ValidationError> {
        let start = end
            .checked_sub(lookback)
            .ok_or(ValidationError::InvalidLookback)?;
        Self::new(start, end)
    }

    pub fn contains(&self, instant: UtcDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}
