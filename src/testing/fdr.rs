//! P-value adjustment for multiple testing correction
//!
//! Benjamini-Hochberg FDR control, applied once across all genes.

/// Apply Benjamini-Hochberg FDR correction to p-values
///
/// Returns adjusted p-values (q-values) that control the false discovery rate.
/// NaN inputs stay NaN and do not count toward the number of tests.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    if n == 0 {
        return vec![];
    }

    // Sort indices by p-value; NaN last, ties by position for determinism
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        let pa = pvalues[a];
        let pb = pvalues[b];

        match (pa.is_nan(), pb.is_nan()) {
            (true, true) => a.cmp(&b),
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => pa.total_cmp(&pb).then(a.cmp(&b)),
        }
    });

    let m = pvalues.iter().filter(|p| !p.is_nan()).count();
    if m == 0 {
        return vec![f64::NAN; n];
    }

    // Walk from the largest p-value down, carrying the running minimum
    let mut padj = vec![f64::NAN; n];
    let mut cummin = f64::INFINITY;
    let mut rank = m;

    for &i in indices.iter().rev() {
        let p = pvalues[i];

        if !p.is_nan() {
            let adj = (p * m as f64 / rank as f64).min(1.0);
            cummin = cummin.min(adj);
            padj[i] = cummin;
            rank -= 1;
        }
    }

    padj
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bh_basic() {
        let pvalues = vec![0.01, 0.04, 0.03, 0.02];
        let padj = benjamini_hochberg(&pvalues);

        for (p, adj) in pvalues.iter().zip(padj.iter()) {
            assert!(*adj >= *p);
            assert!(*adj <= 1.0);
        }
        for adj in &padj {
            assert_abs_diff_eq!(*adj, 0.04, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bh_known_values() {
        // p.adjust(c(0.001, 0.008, 0.039, 0.041, 0.042, 0.06), "BH")
        let padj = benjamini_hochberg(&[0.001, 0.008, 0.039, 0.041, 0.042, 0.06]);
        let expected = [0.006, 0.024, 0.0504, 0.0504, 0.0504, 0.06];
        for (a, e) in padj.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bh_with_nan() {
        let pvalues = vec![0.01, f64::NAN, 0.03, 0.02];
        let padj = benjamini_hochberg(&pvalues);

        assert!(padj[0].is_finite());
        assert!(padj[1].is_nan());
        assert!(padj[2].is_finite());
        assert!(padj[3].is_finite());
    }

    #[test]
    fn test_bh_preserves_rank_order() {
        let pvalues = vec![0.2, 0.001, 0.05, 0.01, 0.9, 0.05, 1.0];
        let padj = benjamini_hochberg(&pvalues);

        for i in 0..pvalues.len() {
            assert!(padj[i] >= pvalues[i]);
            for j in 0..pvalues.len() {
                if pvalues[i] < pvalues[j] {
                    assert!(padj[i] <= padj[j], "rank order broken at {} vs {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_bh_sentinel_ones() {
        let padj = benjamini_hochberg(&[1.0, 1.0, 0.0001]);
        assert_abs_diff_eq!(padj[0], 1.0);
        assert_abs_diff_eq!(padj[1], 1.0);
        assert_abs_diff_eq!(padj[2], 0.0003, epsilon = 1e-15);
    }

    #[test]
    fn test_bh_empty() {
        assert!(benjamini_hochberg(&[]).is_empty());
    }
}
