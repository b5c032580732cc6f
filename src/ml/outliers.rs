/// Default IQR multiplier for the outlier bounds
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Replace IQR outliers in a numeric column with missing-value markers.
///
/// Outliers are values below `Q1 - multiplier * IQR` or above
/// `Q3 + multiplier * IQR`, with the quartiles computed over the non-null
/// values of the column. Offending values become `None`; everything else,
/// existing nulls included, passes through unchanged. Row count and order
/// are preserved.
///
/// A column with zero variance has `IQR == 0`, so every value not equal to
/// the quartiles is suppressed. That is the intended behavior, not a
/// degenerate case to work around.
pub fn filter_outliers(values: &[Option<f64>], multiplier: f64) -> Vec<Option<f64>> {
    let mut present: Vec<f64> = values.iter().copied().flatten().collect();
    if present.is_empty() {
        // no bounds can be computed over an all-null column
        return values.to_vec();
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&present, 0.25);
    let q3 = quantile(&present, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values
        .iter()
        .map(|value| match value {
            Some(v) if *v < lower || *v > upper => None,
            other => *other,
        })
        .collect()
}

/// Quantile of a sorted slice using linear interpolation between order
/// statistics (`pos = (n - 1) * q`).
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
