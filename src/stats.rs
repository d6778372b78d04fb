//! Descriptive statistics shared across modules
//!
//! Contains the per-group moments used by the t-tests, probe collapsing and
//! heatmap row scaling.

/// Arithmetic mean; NaN for an empty slice
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unbiased sample variance (n - 1 denominator).
///
/// Exactly 0 for fewer than two values or when every value is equal, so
/// constant groups never pick up rounding residue from the mean.
pub fn sample_variance(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 || is_constant(x) {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// All values equal (max - min == 0)
pub fn is_constant(x: &[f64]) -> bool {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    hi - lo == 0.0
}

/// Mean and unbiased variance of the values of `row` at `indices`
pub fn group_moments(row: &[f64], indices: &[usize]) -> (f64, f64) {
    let values: Vec<f64> = indices.iter().map(|&i| row[i]).collect();
    (mean(&values), sample_variance(&values))
}

/// Center and scale to unit standard deviation.
/// Constant rows map to all zeros.
pub fn z_scores(x: &[f64]) -> Vec<f64> {
    let m = mean(x);
    let sd = sample_variance(x).sqrt();
    if sd > 0.0 && sd.is_finite() {
        x.iter().map(|&v| (v - m) / sd).collect()
    } else {
        vec![0.0; x.len()]
    }
}

/// -log10(p) with p clamped to the smallest positive double
pub fn neg_log10(p: f64) -> f64 {
    -p.max(f64::MIN_POSITIVE).log10()
}

/// Euclidean distance between two equally long vectors
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
