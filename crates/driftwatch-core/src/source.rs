//! The read seam between the engine and wherever observations live.

use tracing::{debug, warn};

use crate::engine::{compute, EngineConfig, Snapshot};
use crate::{
    EngineError, Observation, SourceError, Symbol, TimeWindow, UtcDateTime, Warehouse,
};

/// Anything that can hand the engine one consistent batch of observations.
///
/// Implementations should return rows ordered by timestamp with ties in
/// arrival order; the engine sorts stably either way.
pub trait ObservationSource {
    fn fetch(&self, window: &TimeWindow) -> Result<Vec<Observation>, SourceError>;
}

impl ObservationSource for Warehouse {
    fn fetch(&self, window: &TimeWindow) -> Result<Vec<Observation>, SourceError> {
        let records = self
            .fetch_observations(window.start.unix_millis(), window.end.unix_millis())
            .map_err(|error| SourceError::unavailable(error.to_string()))?;

        records
            .into_iter()
            .map(|record| {
                let symbol = Symbol::parse(&record.symbol).map_err(|error| {
                    SourceError::invalid_record(format!("stored symbol '{}': {error}", record.symbol))
                })?;
                let timestamp = UtcDateTime::from_unix_millis(record.ts_ms)
                    .map_err(|error| SourceError::invalid_record(error.to_string()))?;
                Observation::new(symbol, record.price, timestamp).map_err(|error| {
                    SourceError::invalid_record(format!("stored price for {}: {error}", record.symbol))
                })
            })
            .collect()
    }
}

impl ObservationSource for [Observation] {
    fn fetch(&self, window: &TimeWindow) -> Result<Vec<Observation>, SourceError> {
        Ok(self
            .iter()
            .filter(|observation| window.contains(observation.timestamp))
            .cloned()
            .collect())
    }
}

/// Fetch `window` from `source` and run the engine over it.
///
/// The source handle is owned by the caller and may be shared by concurrent
/// computations.
pub fn compute_window<S>(
    source: &S,
    window: TimeWindow,
    config: &EngineConfig,
) -> Result<Snapshot, EngineError>
where
    S: ObservationSource + ?Sized,
{
    let fetched = source.fetch(&window)?;
    let total = fetched.len();
    let observations: Vec<Observation> = fetched
        .into_iter()
        .filter(|observation| window.contains(observation.timestamp))
        .collect();
    if observations.len() != total {
        warn!(
            dropped = total - observations.len(),
            "source returned observations outside the requested window"
        );
    }
    debug!(
        start = %window.start,
        end = %window.end,
        observations = observations.len(),
        "fetched window"
    );

    let mut snapshot = compute(observations, config)?;
    snapshot.window = Some(window);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl ObservationSource for Offline {
        fn fetch(&self, _window: &TimeWindow) -> Result<Vec<Observation>, SourceError> {
            Err(SourceError::unavailable("database is locked"))
        }
    }

    struct Sloppy(Vec<Observation>);

    impl ObservationSource for Sloppy {
        fn fetch(&self, _window: &TimeWindow) -> Result<Vec<Observation>, SourceError> {
            Ok(self.0.clone())
        }
    }

    fn ts(minute: i64) -> UtcDateTime {
        UtcDateTime::from_unix_millis(minute * 60_000).expect("timestamp")
    }

    fn observation(symbol: &str, price: f64, minute: i64) -> Observation {
        Observation::new(Symbol::parse(symbol).expect("symbol"), price, ts(minute))
            .expect("observation")
    }

    #[test]
    fn source_failures_surface_as_engine_errors() {
        let window = TimeWindow::new(ts(0), ts(10)).expect("window");
        let err = compute_window(&Offline, window, &EngineConfig::default()).expect_err("must fail");

        assert_eq!(err.code(), "source_error");
        assert_eq!(err.to_string(), "observation source failed: database is locked");
    }

    #[test]
    fn slice_source_honours_the_half_open_window() {
        let observations = vec![
            observation("AUSDT", 1.0, 0),
            observation("AUSDT", 2.0, 1),
            observation("AUSDT", 4.0, 2),
        ];
        let window = TimeWindow::new(ts(0), ts(2)).expect("window");

        let snapshot =
            compute_window(observations.as_slice(), window, &EngineConfig::default()).expect("snapshot");

        assert_eq!(snapshot.window, Some(window));
        assert_eq!(snapshot.average.len(), 1);
        assert_eq!(snapshot.average.points()[0].value, 100.0);
    }

    #[test]
    fn rows_outside_the_window_are_dropped() {
        let source = Sloppy(vec![observation("AUSDT", 1.0, 30)]);
        let window = TimeWindow::new(ts(0), ts(10)).expect("window");

        let err = compute_window(&source, window, &EngineConfig::default()).expect_err("must fail");
        assert_eq!(err, EngineError::EmptyInput);
    }
}
