//! Statistics over trial measurements.

/// Compute the median of a slice of measurements.
///
/// The samples are sorted internally. For an even number of samples the
/// result is the mean of the two middle values.
///
/// # Panics
/// Panics if `samples` is empty.
#[must_use]
pub fn compute_median(samples: &[f64]) -> f64 {
    assert!(!samples.is_empty(), "samples must not be empty");

    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let len = sorted.len();
    if len % 2 == 1 {
        sorted[len / 2]
    } else {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    }
}
