//! Small numeric helpers shared by the engine stages.

/// Arithmetic mean, `None` for an empty slice.
///
/// The result is clamped to the sample's range: summation rounding can
/// otherwise land an ulp outside it (three copies of `0.1` average to
/// `0.10000000000000002`).
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(*value), max.max(*value))
        });
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(mean.clamp(min, max))
}

/// Percentile `p` (0..=100) with linear interpolation between closest ranks.
///
/// Matches NumPy's default `percentile`, including its two-sided lerp, so the
/// result equals the upper neighbour exactly whenever both neighbours are
/// equal. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower_index = rank.floor() as usize;
    let upper_index = rank.ceil() as usize;
    let lower = sorted[lower_index];
    let upper = sorted[upper_index];
    let t = rank - lower_index as f64;

    let value = if t >= 0.5 {
        upper - (upper - lower) * (1.0 - t)
    } else {
        lower + (upper - lower) * t
    };
    Some(value)
}
