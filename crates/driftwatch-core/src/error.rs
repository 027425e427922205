use thiserror::Error;

use crate::{ChangeMode, Symbol, UtcDateTime};

/// Validation and contract errors exposed by `driftwatch-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {millis}ms is out of range")]
    TimestampOutOfRange { millis: i64 },

    #[error("invalid resolution '{value}', expected one of 1m, 5m, 15m, 1h")]
    InvalidResolution { value: String },
    #[error("invalid change mode '{value}', expected percentage or cumulative")]
    InvalidChangeMode { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("window start {start} must be before end {end}")]
    InvalidWindow { start: String, end: String },
    #[error("lookback must be positive and representable")]
    InvalidLookback,
    #[error("percentile must be within 0..=100, got {value}")]
    InvalidPercentile { value: String },
    #[error("score window must be at least 1")]
    InvalidScoreWindow,
    #[error("weight curve requires base >= 1 and scale > 0")]
    InvalidWeightCurve,

    #[error("series for '{symbol}' is not strictly increasing at index {index}")]
    UnorderedSeries { symbol: String, index: usize },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Malformed numeric input discovered while deriving series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("non-positive price {price} for {symbol} before {timestamp}")]
    NonPositivePrice {
        symbol: Symbol,
        timestamp: UtcDateTime,
        price: f64,
    },

    #[error("no contributing symbols at timestamp {timestamp}")]
    NoContributors { timestamp: UtcDateTime },

    #[error("non-finite change for {symbol} at {timestamp}")]
    NonFiniteValue {
        symbol: Symbol,
        timestamp: UtcDateTime,
    },

    #[error("non-finite market average at {timestamp}")]
    NonFiniteAverage { timestamp: UtcDateTime },

    #[error("expected {expected} series, found {found}")]
    ModeMismatch {
        expected: ChangeMode,
        found: ChangeMode,
    },
}

/// Categories of observation source failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The backing store could not be read.
    Unavailable,
    /// A stored row could not be turned into an [`crate::Observation`].
    InvalidRecord,
}

/// Failure reading observations from a source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRecord,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Every way a snapshot computation can fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("no observations in window")]
    EmptyInput,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("observation source failed: {0}")]
    Source(#[from] SourceError),
}

impl EngineError {
    /// Stable machine-readable code for envelopes and exit statuses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::Data(_) => "data_error",
            Self::Source(_) => "source_error",
        }
    }
}
