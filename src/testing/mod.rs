//! Statistical testing for differential expression

mod fdr;
mod pvalue;
mod ttest;

pub use fdr::benjamini_hochberg;
pub use pvalue::calculate_pvalue_t;
pub use ttest::{t_test, GroupSummary, TTest};

use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::data::{GeneMatrix, GroupDesign, SampleGroup};
use crate::error::{DegError, Result};
use crate::io::{DegRecord, DegResults, Regulation};
use crate::stats::group_moments;

/// log2 fold change of tumor over normal
pub fn log2_fold_change(mean_tumor: f64, mean_normal: f64, pseudocount: f64, log2_input: bool) -> f64 {
    if log2_input {
        mean_tumor - mean_normal
    } else {
        (mean_tumor + pseudocount).log2() - (mean_normal + pseudocount).log2()
    }
}

struct GeneTest {
    mean_tumor: f64,
    mean_normal: f64,
    log2_fold_change: f64,
    test: Option<TTest>,
}

/// Compare tumor against normal for every gene.
///
/// `design.columns` index into the gene matrix columns. Genes whose t
/// statistic is undefined (zero variance in a group) or whose fold change is
/// not finite are kept with p = 1 and `undefined_stat` set. BH adjustment is
/// applied once across all genes.
pub fn differential_expression(
    genes: &GeneMatrix,
    design: &GroupDesign,
    config: &AnalysisConfig,
) -> Result<DegResults> {
    if let Some(&bad) = design.columns.iter().find(|&&c| c >= genes.n_samples()) {
        return Err(DegError::DimensionMismatch {
            expected: format!("column index < {}", genes.n_samples()),
            got: format!("{}", bad),
        });
    }

    let tumor: Vec<usize> = design
        .indices_of(SampleGroup::Tumor)
        .into_iter()
        .map(|i| design.columns[i])
        .collect();
    let normal: Vec<usize> = design
        .indices_of(SampleGroup::Normal)
        .into_iter()
        .map(|i| design.columns[i])
        .collect();

    for (group, cols) in [(SampleGroup::Tumor, &tumor), (SampleGroup::Normal, &normal)] {
        if cols.len() < 2 {
            return Err(DegError::InvalidInput {
                reason: format!(
                    "group {} has {} samples; at least 2 are required for a t-test",
                    group,
                    cols.len()
                ),
            });
        }
    }

    let values = genes.values();
    let tests: Vec<GeneTest> = (0..genes.n_genes())
        .into_par_iter()
        .map(|i| {
            let row = values.row(i).to_vec();
            let (mean_t, var_t) = group_moments(&row, &tumor);
            let (mean_n, var_n) = group_moments(&row, &normal);
            let lfc = log2_fold_change(mean_t, mean_n, config.pseudocount, config.log2_input);

            let test = if lfc.is_finite() {
                t_test(
                    GroupSummary::new(mean_t, var_t, tumor.len()),
                    GroupSummary::new(mean_n, var_n, normal.len()),
                    config.equal_variance,
                )
            } else {
                None
            };

            GeneTest {
                mean_tumor: mean_t,
                mean_normal: mean_n,
                log2_fold_change: lfc,
                test,
            }
        })
        .collect();

    let pvalues: Vec<f64> = tests
        .iter()
        .map(|t| t.test.map_or(1.0, |tt| tt.pvalue))
        .collect();
    let padj = benjamini_hochberg(&pvalues);

    let n_undefined = tests.iter().filter(|t| t.test.is_none()).count();
    if n_undefined > 0 {
        log::warn!(
            "{} genes have an undefined t statistic (zero variance in a group or non-finite fold change); p-value set to 1",
            n_undefined
        );
    }

    let records = tests
        .iter()
        .enumerate()
        .map(|(i, t)| DegRecord {
            gene_symbol: genes.gene_symbols()[i].clone(),
            probe_id: genes.source_probes()[i].clone(),
            mean_tumor: t.mean_tumor,
            mean_normal: t.mean_normal,
            log2_fold_change: t.log2_fold_change,
            t_statistic: t.test.map_or(f64::NAN, |tt| tt.statistic),
            df: t.test.map_or(f64::NAN, |tt| tt.df),
            pvalue: pvalues[i],
            padj: padj[i],
            regulation: Regulation::classify(
                t.log2_fold_change,
                padj[i],
                config.lfc_threshold,
                config.padj_threshold,
            ),
            undefined_stat: t.test.is_none(),
        })
        .collect();

    Ok(DegResults {
        records,
        n_tumor: tumor.len(),
        n_normal: normal.len(),
        lfc_threshold: config.lfc_threshold,
        padj_threshold: config.padj_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn gene_matrix() -> GeneMatrix {
        GeneMatrix::new(
            array![
                [50.0, 50.0, 50.0, 10.0, 20.0, 30.0],       // zero tumor variance
                [75.0, 80.0, 70.0, 300.0, 310.0, 290.0],    // down 2 log2 units
                [500.0, 520.0, 480.0, 500.0, 510.0, 490.0], // flat
                [0.1, 0.1, 0.1, 0.7, 0.7, 0.7],             // constant in both groups
                [400.0, 420.0, 380.0, 100.0, 110.0, 90.0]   // up 2 log2 units
            ],
            vec!["CONST".into(), "DOWN".into(), "FLAT".into(), "FRAC".into(), "UP".into()],
            vec!["p1".into(), "p2".into(), "p3".into(), "p4".into(), "p5".into()],
            (1..=6).map(|i| format!("GSM{}", i)).collect(),
        )
        .unwrap()
    }

    fn design() -> GroupDesign {
        use SampleGroup::*;
        GroupDesign {
            columns: (0..6).collect(),
            groups: vec![Tumor, Tumor, Tumor, Normal, Normal, Normal],
        }
    }

    #[test]
    fn test_log2_fold_change() {
        assert_abs_diff_eq!(log2_fold_change(400.0, 100.0, 0.0, false), 2.0);
        assert_abs_diff_eq!(log2_fold_change(8.0, 6.0, 0.0, true), 2.0);
        assert!(log2_fold_change(0.0, 0.0, 1e-9, false).abs() < 1e-12);
    }

    #[test]
    fn test_differential_expression_calls() {
        let results = differential_expression(&gene_matrix(), &design(), &AnalysisConfig::default()).unwrap();

        assert_eq!(results.n_genes(), 5);
        assert_eq!(results.n_tumor, 3);
        let by_symbol = |s: &str| results.records.iter().find(|r| r.gene_symbol == s).unwrap();

        let up = by_symbol("UP");
        assert_abs_diff_eq!(up.log2_fold_change, 2.0, epsilon = 1e-9);
        assert_eq!(up.regulation, Regulation::Up);

        let down = by_symbol("DOWN");
        assert!(down.log2_fold_change < -1.5);
        assert_eq!(down.regulation, Regulation::Down);

        assert_eq!(by_symbol("FLAT").regulation, Regulation::NotSignificant);
    }

    #[test]
    fn test_zero_variance_flagged_not_dropped() {
        let results = differential_expression(&gene_matrix(), &design(), &AnalysisConfig::default()).unwrap();
        let constant = &results.records[0];

        assert_eq!(constant.gene_symbol, "CONST");
        assert!(constant.undefined_stat);
        assert_eq!(constant.pvalue, 1.0);
        assert!(constant.t_statistic.is_nan());
        assert_eq!(constant.regulation, Regulation::NotSignificant);
    }

    #[test]
    fn test_inexact_constants_flagged() {
        let results = differential_expression(&gene_matrix(), &design(), &AnalysisConfig::default()).unwrap();
        let frac = &results.records[3];

        assert_eq!(frac.gene_symbol, "FRAC");
        assert!(frac.undefined_stat);
        assert_eq!(frac.pvalue, 1.0);
        assert_eq!(frac.padj, 1.0);
        assert!(frac.log2_fold_change < -1.5);
        assert_eq!(frac.regulation, Regulation::NotSignificant);

        let equal_var = AnalysisConfig {
            equal_variance: true,
            ..Default::default()
        };
        let results = differential_expression(&gene_matrix(), &design(), &equal_var).unwrap();
        assert!(results.records[3].undefined_stat);
    }

    #[test]
    fn test_results_feed_heatmap() {
        let genes = gene_matrix();
        let results = differential_expression(&genes, &design(), &AnalysisConfig::default()).unwrap();
        let data = crate::plot::heatmap_data(&genes, &design(), &results, None)
            .unwrap()
            .unwrap();

        let mut shown = data.genes.clone();
        shown.sort();
        assert_eq!(shown, vec!["DOWN".to_string(), "UP".to_string()]);
    }

    #[test]
    fn test_padj_not_below_raw() {
        let results = differential_expression(&gene_matrix(), &design(), &AnalysisConfig::default()).unwrap();
        for r in &results.records {
            assert!(r.padj >= r.pvalue);
        }
    }

    #[test]
    fn test_design_subset_columns() {
        use SampleGroup::*;
        let design = GroupDesign {
            columns: vec![0, 1, 3, 4],
            groups: vec![Tumor, Tumor, Normal, Normal],
        };
        let results = differential_expression(&gene_matrix(), &design, &AnalysisConfig::default()).unwrap();
        assert_eq!(results.n_tumor, 2);
        assert_abs_diff_eq!(results.records[4].mean_tumor, 410.0);
        assert_abs_diff_eq!(results.records[4].mean_normal, 105.0);
    }

    #[test]
    fn test_too_few_samples() {
        use SampleGroup::*;
        let design = GroupDesign {
            columns: vec![0, 3, 4],
            groups: vec![Tumor, Normal, Normal],
        };
        let result = differential_expression(&gene_matrix(), &design, &AnalysisConfig::default());
        assert!(matches!(result, Err(DegError::InvalidInput { .. })));
    }
}
