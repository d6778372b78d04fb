//! Unpaired two-sample t-tests

use super::pvalue::calculate_pvalue_t;

/// Outcome of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    /// t statistic (first group minus second group)
    pub statistic: f64,
    /// Degrees of freedom (Welch–Satterthwaite or pooled)
    pub df: f64,
    /// Two-sided p-value
    pub pvalue: f64,
}

/// Summary of one group: mean, unbiased variance, size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSummary {
    pub mean: f64,
    pub variance: f64,
    pub n: usize,
}

impl GroupSummary {
    pub fn new(mean: f64, variance: f64, n: usize) -> Self {
        Self { mean, variance, n }
    }
}

/// Two-sided t-test on summarized groups.
///
/// Returns None when the statistic is undefined: fewer than two samples in a
/// group, or zero variance in either group. Variances come from
/// [`crate::stats::sample_variance`], which is exactly 0 for constant groups.
pub fn t_test(a: GroupSummary, b: GroupSummary, equal_variance: bool) -> Option<TTest> {
    if a.n < 2 || b.n < 2 {
        return None;
    }
    if !(a.variance > 0.0) || !(b.variance > 0.0) {
        return None;
    }

    let (n1, n2) = (a.n as f64, b.n as f64);
    let (se, df) = if equal_variance {
        let df = n1 + n2 - 2.0;
        let pooled = ((n1 - 1.0) * a.variance + (n2 - 1.0) * b.variance) / df;
        ((pooled * (1.0 / n1 + 1.0 / n2)).sqrt(), df)
    } else {
        let q1 = a.variance / n1;
        let q2 = b.variance / n2;
        let df = (q1 + q2).powi(2) / (q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0));
        ((q1 + q2).sqrt(), df)
    };

    let statistic = (a.mean - b.mean) / se;
    if !statistic.is_finite() || !df.is_finite() {
        return None;
    }

    Some(TTest {
        statistic,
        df,
        pvalue: calculate_pvalue_t(statistic, df),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{mean, sample_variance};
    use approx::assert_abs_diff_eq;

    fn summarize(x: &[f64]) -> GroupSummary {
        GroupSummary::new(mean(x), sample_variance(x), x.len())
    }

    #[test]
    fn test_welch_equal_variances() {
        let a = summarize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = summarize(&[6.0, 7.0, 8.0, 9.0, 10.0]);
        let t = t_test(a, b, false).unwrap();

        assert_abs_diff_eq!(t.statistic, -5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.df, 8.0, epsilon = 1e-12);
        // 2 * pt(-5, 8)
        assert!(t.pvalue > 0.0010 && t.pvalue < 0.0011, "p = {}", t.pvalue);
    }

    #[test]
    fn test_welch_df_below_pooled() {
        let a = summarize(&[1.0, 1.5, 0.5, 1.2]);
        let b = summarize(&[3.0, 9.0, 5.0, 12.0, 7.0, 1.0]);
        let welch = t_test(a, b, false).unwrap();
        let pooled = t_test(a, b, true).unwrap();

        assert_abs_diff_eq!(pooled.df, 8.0);
        assert!(welch.df < pooled.df);
        assert!(welch.pvalue > 0.0 && welch.pvalue < 1.0);
    }

    #[test]
    fn test_identical_means_give_p_one() {
        let a = summarize(&[1.0, 2.0, 3.0]);
        let b = summarize(&[3.0, 2.0, 1.0]);
        let t = t_test(a, b, false).unwrap();
        assert_abs_diff_eq!(t.statistic, 0.0);
        assert_abs_diff_eq!(t.pvalue, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_is_undefined() {
        let flat = summarize(&[4.0, 4.0, 4.0]);
        let varied = summarize(&[1.0, 2.0, 3.0]);
        assert!(t_test(flat, varied, false).is_none());
        assert!(t_test(varied, flat, true).is_none());
    }

    #[test]
    fn test_inexact_constant_groups_are_undefined() {
        let tumor = summarize(&[0.1, 0.1, 0.1]);
        let normal = summarize(&[0.7, 0.7, 0.7]);
        assert!(t_test(tumor, normal, false).is_none());
        assert!(t_test(tumor, normal, true).is_none());
    }

    #[test]
    fn test_single_sample_is_undefined() {
        let one = summarize(&[4.0]);
        let varied = summarize(&[1.0, 2.0, 3.0]);
        assert!(t_test(one, varied, false).is_none());
    }
}
