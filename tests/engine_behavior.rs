//! Behavior-driven tests for the aggregation & outlier-ranking engine
//!
//! These tests drive `compute` the way a refresh sink would and check the
//! user-visible outcome: which symbols are highlighted, with what weight, and
//! which typed failure is reported when the input is unusable.

use driftwatch_core::{
    compute, ChangeMode, DataError, EngineConfig, EngineError, EnvelopeError, Observation,
    Resolution, Symbol, UtcDateTime,
};

fn at(minute: i64, second: i64) -> UtcDateTime {
    UtcDateTime::from_unix_millis(1_704_067_200_000 + minute * 60_000 + second * 1_000)
        .expect("timestamp")
}

fn observation(symbol: &str, price: f64, minute: i64) -> Observation {
    observation_at(symbol, price, at(minute, 0))
}

fn observation_at(symbol: &str, price: f64, timestamp: UtcDateTime) -> Observation {
    Observation::new(Symbol::parse(symbol).expect("symbol"), price, timestamp)
        .expect("observation")
}

fn rising_and_falling() -> Vec<Observation> {
    vec![
        observation("A", 100.0, 0),
        observation("A", 102.0, 1),
        observation("A", 104.0, 2),
        observation("B", 100.0, 0),
        observation("B", 99.0, 1),
        observation("B", 98.0, 2),
    ]
}

// =============================================================================
// Engine: Reference scenario
// =============================================================================

#[test]
fn when_two_symbols_diverge_the_average_sits_between_them() {
    // Given: A rises 2% a minute and B falls 1% a minute
    let observations = rising_and_falling();

    // When: The engine computes a percentage snapshot
    let snapshot = compute(observations, &EngineConfig::default()).expect("snapshot");

    // Then: Each symbol's changes and the per-minute average are as expected
    let a = &snapshot.series[&Symbol::parse("A").expect("symbol")];
    let b = &snapshot.series[&Symbol::parse("B").expect("symbol")];
    assert_eq!(a.points()[0].value, 2.0);
    assert!((a.points()[1].value - 1.960_784_313_725_490_1).abs() < 1e-12);
    assert_eq!(b.points()[0].value, -1.0);
    assert!((b.points()[1].value + 1.010_101_010_101_010_2).abs() < 1e-12);

    let average: Vec<f64> = snapshot.average.points().iter().map(|point| point.value).collect();
    assert_eq!(average.len(), 2);
    assert_eq!(average[0], 0.5);
    assert!((average[1] - 0.475_341_651_812_24).abs() < 1e-9);
}

#[test]
fn when_only_two_symbols_exist_the_percentile_threshold_retains_none() {
    // Given: The two-symbol scenario, whose deviations from the average are equal
    let observations = rising_and_falling();

    // When: The engine filters at the 95th percentile
    let snapshot = compute(observations, &EngineConfig::default()).expect("snapshot");

    // Then: The threshold equals the largest deviation and strict `>` keeps nobody
    let threshold = snapshot.threshold.expect("threshold");
    let a = &snapshot.series[&Symbol::parse("A").expect("symbol")];
    let last_average = snapshot.average.last().expect("average").value;
    let largest = (a.last().expect("change").value - last_average).abs();
    assert_eq!(threshold, largest);
    assert!(snapshot.outliers.is_empty(), "no symbol strictly exceeds the threshold");
    assert!(snapshot.highlighted.is_empty());
    assert!(snapshot.warnings.is_empty(), "an empty selection is not a warning");
}

#[test]
fn when_every_deviation_ties_no_percentile_can_select_a_symbol() {
    // Given: The same scenario and a zero percentile
    let config = EngineConfig::default()
        .with_percentile(0.0)
        .expect("config");

    // When: The engine runs
    let snapshot = compute(rising_and_falling(), &config).expect("snapshot");

    // Then: Both deviations sit exactly on the threshold, so nobody passes
    let threshold = snapshot.threshold.expect("threshold");
    let b = &snapshot.series[&Symbol::parse("B").expect("symbol")];
    let last_average = snapshot.average.last().expect("average").value;
    assert_eq!(threshold, (b.last().expect("change").value - last_average).abs());
    assert!(snapshot.outliers.is_empty());
}

// =============================================================================
// Engine: Failure paths
// =============================================================================

#[test]
fn when_a_previous_price_is_zero_the_whole_computation_fails() {
    // Given: B has a zero price that a later minute divides by
    let observations = vec![
        observation("A", 100.0, 0),
        observation("A", 101.0, 1),
        observation("A", 102.0, 2),
        observation("B", 100.0, 0),
        observation("B", 0.0, 1),
        observation("B", 5.0, 2),
    ];

    // When: The engine runs
    let err = compute(observations, &EngineConfig::default()).expect_err("must fail");

    // Then: A typed data error names the symbol, and no snapshot is produced
    match &err {
        EngineError::Data(DataError::NonPositivePrice { symbol, price, timestamp }) => {
            assert_eq!(symbol.as_str(), "B");
            assert_eq!(*price, 0.0);
            assert_eq!(*timestamp, at(2, 0));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(EnvelopeError::from(&err).code, "data_error");
}

#[test]
fn when_the_window_is_empty_the_failure_is_distinguishable() {
    // Given: No observations at all
    // When: The engine runs
    let err = compute(Vec::new(), &EngineConfig::default()).expect_err("must fail");

    // Then: The failure is EmptyInput, not a data error
    assert_eq!(err, EngineError::EmptyInput);
    assert_eq!(EnvelopeError::from(&err).code, "empty_input");
}

// =============================================================================
// Engine: Alignment policy
// =============================================================================

#[test]
fn when_a_minute_has_several_prices_the_latest_one_is_used() {
    // Given: Two prices inside minute 1, delivered newest first
    let observations = vec![
        observation("A", 100.0, 0),
        observation_at("A", 110.0, at(1, 50)),
        observation_at("A", 90.0, at(1, 10)),
    ];

    // When: The engine aligns to one-minute slots
    let snapshot = compute(observations, &EngineConfig::default()).expect("snapshot");

    // Then: The later price (by timestamp) fills the slot
    let a = &snapshot.series[&Symbol::parse("A").expect("symbol")];
    assert_eq!(a.len(), 1);
    assert!((a.points()[0].value - 10.0).abs() < 1e-12);
    assert_eq!(a.points()[0].timestamp, at(1, 0));
}

#[test]
fn when_duplicates_share_a_timestamp_the_last_arrival_wins() {
    // Given: Two observations with the identical timestamp
    let observations = vec![
        observation("A", 100.0, 0),
        observation("A", 120.0, 1),
        observation("A", 150.0, 1),
    ];

    // When: The engine runs twice on the same input
    let first = compute(observations.clone(), &EngineConfig::default()).expect("snapshot");
    let second = compute(observations, &EngineConfig::default()).expect("snapshot");

    // Then: The later arrival wins, every time
    let a = &first.series[&Symbol::parse("A").expect("symbol")];
    assert_eq!(a.points()[0].value, 50.0);
    assert_eq!(first, second);
}

#[test]
fn when_resolution_is_coarser_more_observations_share_a_slot() {
    // Given: Prices every minute for ten minutes
    let observations: Vec<Observation> = (0..10)
        .map(|minute| observation("A", 100.0 + minute as f64, minute))
        .collect();

    // When: The engine aligns to five-minute slots
    let config = EngineConfig::default().with_resolution(Resolution::FiveMinutes);
    let snapshot = compute(observations, &config).expect("snapshot");

    // Then: Only the two slot boundaries remain, carrying each slot's last price
    let a = &snapshot.series[&Symbol::parse("A").expect("symbol")];
    assert_eq!(a.len(), 1);
    assert!((a.points()[0].value - (109.0 - 104.0) / 104.0 * 100.0).abs() < 1e-12);
    assert_eq!(a.points()[0].timestamp, at(5, 0));
}

// =============================================================================
// Engine: Cumulative mode
// =============================================================================

#[test]
fn when_cumulative_mode_is_selected_indices_compound_from_one() {
    // Given: The two-symbol scenario
    let config = EngineConfig::default().with_mode(ChangeMode::Cumulative);

    // When: The engine computes cumulative growth
    let snapshot = compute(rising_and_falling(), &config).expect("snapshot");

    // Then: Each symbol's index is its total return and the average compounds mean growth
    let a = &snapshot.series[&Symbol::parse("A").expect("symbol")];
    let b = &snapshot.series[&Symbol::parse("B").expect("symbol")];
    assert!((a.last().expect("change").value - 1.04).abs() < 1e-12);
    assert!((b.last().expect("change").value - 0.98).abs() < 1e-12);

    let first_growth = (1.02 + 0.99) / 2.0;
    let second_growth = (104.0 / 102.0 + 98.0 / 99.0) / 2.0;
    let average = snapshot.average.points();
    assert!((average[0].value - first_growth).abs() < 1e-12);
    assert!((average[1].value - first_growth * second_growth).abs() < 1e-12);
    assert_eq!(snapshot.mode, ChangeMode::Cumulative);
}

#[test]
fn when_cumulative_mode_is_selected_the_runner_is_still_singled_out() {
    // Given: Twenty flat symbols and one that gains 10% a minute
    let mut observations = Vec::new();
    for index in 0..20 {
        let symbol = format!("F{index:02}");
        for minute in 0..3 {
            observations.push(observation(&symbol, 100.0, minute));
        }
    }
    for (minute, price) in [100.0, 110.0, 121.0].iter().enumerate() {
        observations.push(observation("RUNNER", *price, minute as i64));
    }

    // When: The engine filters and scores cumulative indices
    let config = EngineConfig::default().with_mode(ChangeMode::Cumulative);
    let snapshot = compute(observations, &config).expect("snapshot");

    // Then: The flat symbols tie on the threshold and only the runner is kept
    let average = snapshot.average.last().expect("average").value;
    let threshold = snapshot.threshold.expect("threshold");
    assert!((threshold - (average - 1.0).abs()).abs() < 1e-12);

    let ranked: Vec<(&str, usize, usize)> = snapshot
        .outliers
        .iter()
        .map(|entry| (entry.symbol.as_str(), entry.score, entry.rank))
        .collect();
    assert_eq!(ranked, [("RUNNER", 2, 1)]);
    assert!((snapshot.outliers[0].last_value - 1.21).abs() < 1e-12);
    assert!((snapshot.outliers[0].weight - 2.69).abs() < 1e-12);
    assert_eq!(snapshot.highlighted.len(), 1);
}

#[test]
fn when_the_compounded_average_overflows_the_average_is_blamed() {
    // Given: Two symbols whose own indices stay finite but whose mean growth compounds past f64
    let observations = vec![
        observation("A", 1.0, 0),
        observation("A", 1e200, 1),
        observation("A", 1.0, 2),
        observation("B", 1.0, 0),
        observation("B", 1.0, 1),
        observation("B", 1e200, 2),
    ];

    // When: The engine runs in cumulative mode
    let config = EngineConfig::default().with_mode(ChangeMode::Cumulative);
    let err = compute(observations, &config).expect_err("must fail");

    // Then: The failure names the average's timestamp rather than a symbol
    assert_eq!(
        err,
        EngineError::Data(DataError::NonFiniteAverage { timestamp: at(2, 0) })
    );
}

// =============================================================================
// Engine: Ranking and benchmark
// =============================================================================

#[test]
fn when_several_symbols_break_out_they_are_ranked_by_weight() {
    // Given: Twenty quiet symbols and two runners, one of which beat the market every minute
    let mut observations = Vec::new();
    for index in 0..20 {
        let symbol = format!("Q{index:02}");
        for minute in 0..6 {
            let wobble = if (index + minute) % 2 == 0 { 0.01 } else { -0.01 };
            observations.push(observation(&symbol, 100.0 + wobble, minute));
        }
    }
    for (minute, price) in [100.0, 101.0, 102.0, 103.0, 104.0, 130.0].iter().enumerate() {
        observations.push(observation("STEADY", *price, minute as i64));
    }
    for (minute, price) in [100.0, 99.0, 98.0, 97.0, 96.0, 125.0].iter().enumerate() {
        observations.push(observation("LATE", *price, minute as i64));
    }

    // When: The engine filters at P95 and scores the last ten periods
    let config = EngineConfig::default()
        .with_benchmark(Some(Symbol::parse("Q03").expect("symbol")));
    let snapshot = compute(observations, &config).expect("snapshot");

    // Then: Both runners are kept, the consistent one ranks first
    let ranked: Vec<(&str, usize, usize)> = snapshot
        .outliers
        .iter()
        .map(|entry| (entry.symbol.as_str(), entry.score, entry.rank))
        .collect();
    assert_eq!(ranked, [("STEADY", 5, 1), ("LATE", 1, 2)]);
    assert!(snapshot.outliers[0].weight > snapshot.outliers[1].weight);

    // And: The benchmark is reported without being ranked
    let benchmark = snapshot.benchmark.as_ref().expect("benchmark");
    assert_eq!(benchmark.symbol.as_str(), "Q03");
    assert!(benchmark.benchmark);
    assert_eq!(benchmark.rank, 0);
    assert_eq!(snapshot.highlighted.len(), 3);
}
