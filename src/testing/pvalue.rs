//! P-value calculation from test statistics

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Calculate two-sided p-value from t-statistic with given degrees of freedom
/// 2 * P(T_df > |stat|)
pub fn calculate_pvalue_t(stat: f64, df: f64) -> f64 {
    if !stat.is_finite() || !(df > 0.0) {
        return f64::NAN;
    }

    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => (2.0 * t_dist.cdf(-stat.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pvalue_symmetric() {
        let p1 = calculate_pvalue_t(2.0, 10.0);
        let p2 = calculate_pvalue_t(-2.0, 10.0);
        assert!((p1 - p2).abs() < 1e-12);
    }

    #[test]
    fn test_pvalue_range() {
        for t in [-30.0, -3.0, -1.0, 0.0, 1.0, 3.0, 30.0] {
            let p = calculate_pvalue_t(t, 5.0);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_pvalue_zero() {
        let p = calculate_pvalue_t(0.0, 7.0);
        assert!((p - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_small_df_more_conservative() {
        let p_large = calculate_pvalue_t(2.0, 1000.0);
        let p_small = calculate_pvalue_t(2.0, 3.0);
        assert!(p_small > p_large);
        // normal limit: 2 * pnorm(-2)
        assert!((p_large - 0.0455).abs() < 0.001);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(calculate_pvalue_t(f64::NAN, 3.0).is_nan());
        assert!(calculate_pvalue_t(1.0, 0.0).is_nan());
    }
}
