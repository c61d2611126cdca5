use crate::error::StatsError;

/// Upper bound of the percentile range; returns the largest sample as-is.
pub const MAX_PERCENT: u32 = 100;

/// Percentile of an ascending sample set, interpolating linearly between the
/// two order statistics around the fractional rank `p * n / 100 + 0.5`.
///
/// Ranks that fall outside `1..=n` (tiny percentiles or very high ones over
/// few samples) clamp to the first or last sample.
///
/// # Errors
///
/// Returns [`StatsError::EmptySamples`] when `sorted` is empty.
pub fn percentile(percent: u32, sorted: &[f64]) -> Result<f64, StatsError> {
    let last = sorted.last().copied().ok_or(StatsError::EmptySamples)?;
    if percent >= MAX_PERCENT {
        return Ok(last);
    }

    let count = u64::try_from(sorted.len()).unwrap_or(u64::MAX);
    let rank = u64::from(percent).saturating_mul(count) as f64 / 100.0 + 0.5;
    let whole = rank.trunc();
    let fraction = rank - whole;

    let lower = order_statistic(sorted, whole as usize);
    let upper = order_statistic(sorted, rank.ceil() as usize);

    Ok((1.0 - fraction) * lower + fraction * upper)
}

/// 1-based order statistic, clamped to the sample range.
fn order_statistic(sorted: &[f64], rank: usize) -> f64 {
    let index = rank
        .saturating_sub(1)
        .min(sorted.len().saturating_sub(1));
    sorted.get(index).copied().unwrap_or_default()
}

/// Sorts samples ascending in place. NaN values sort last.
pub fn sort_samples(samples: &mut [f64]) {
    samples.sort_by(f64::total_cmp);
}
