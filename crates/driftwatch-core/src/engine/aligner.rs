use std::collections::BTreeMap;

use tracing::debug;

use crate::{AlignedPoint, AlignedSeries, EngineError, Observation, Resolution, Symbol};

/// Groups raw observations per symbol onto a fixed timestamp grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAligner {
    resolution: Resolution,
}

impl SeriesAligner {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Align `observations` into one ordered series per symbol.
    ///
    /// Observations are stably sorted by their raw timestamp, so among
    /// observations landing in the same slot the latest one wins, and among
    /// exact timestamp duplicates the one that arrived last wins.
    pub fn align(
        &self,
        observations: Vec<Observation>,
    ) -> Result<BTreeMap<Symbol, AlignedSeries>, EngineError> {
        if observations.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let total = observations.len();
        let mut ordered = observations;
        ordered.sort_by_key(|observation| observation.timestamp);

        let mut slots: BTreeMap<Symbol, BTreeMap<_, f64>> = BTreeMap::new();
        for observation in ordered {
            let slot = observation.timestamp.truncate(self.resolution);
            slots
                .entry(observation.symbol)
                .or_default()
                .insert(slot, observation.price);
        }

        let aligned: BTreeMap<Symbol, AlignedSeries> = slots
            .into_iter()
            .map(|(symbol, prices)| {
                let points = prices
                    .into_iter()
                    .map(|(timestamp, price)| AlignedPoint { timestamp, price })
                    .collect();
                let series = AlignedSeries::from_sorted(symbol.clone(), points);
                (symbol, series)
            })
            .collect();

        debug!(
            observations = total,
            symbols = aligned.len(),
            resolution = %self.resolution,
            "aligned observations"
        );
        Ok(aligned)
    }
}
