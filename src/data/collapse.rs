//! Collapse probes to one representative row per gene symbol

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{ExpressionMatrix, ProbeAnnotation};
use crate::error::{DegError, Result};
use crate::stats::{mean, sample_variance};

/// How the representative probe of a gene is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollapseRule {
    /// Highest mean intensity across samples
    MaxMean,
    /// Highest sample variance across samples
    MaxVariance,
    /// First probe of the gene in matrix order
    First,
}

impl CollapseRule {
    fn score(&self, row: ArrayView1<'_, f64>) -> f64 {
        let values: Vec<f64> = row.to_vec();
        match self {
            CollapseRule::MaxMean => mean(&values),
            CollapseRule::MaxVariance => sample_variance(&values),
            CollapseRule::First => 0.0,
        }
    }
}

impl fmt::Display for CollapseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollapseRule::MaxMean => "max-mean",
            CollapseRule::MaxVariance => "max-variance",
            CollapseRule::First => "first",
        };
        f.write_str(name)
    }
}

impl FromStr for CollapseRule {
    type Err = DegError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max-mean" => Ok(CollapseRule::MaxMean),
            "max-variance" => Ok(CollapseRule::MaxVariance),
            "first" => Ok(CollapseRule::First),
            _ => Err(DegError::InvalidInput {
                reason: format!(
                    "Unknown collapse rule '{}'. Use: max-mean, max-variance, or first",
                    s
                ),
            }),
        }
    }
}

/// Gene-level matrix: one row per gene symbol, sorted by symbol
#[derive(Debug, Clone)]
pub struct GeneMatrix {
    values: Array2<f64>,
    gene_symbols: Vec<String>,
    source_probes: Vec<String>,
    sample_ids: Vec<String>,
}

impl GeneMatrix {
    pub fn new(
        values: Array2<f64>,
        gene_symbols: Vec<String>,
        source_probes: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = values.dim();
        if gene_symbols.len() != n_genes || source_probes.len() != n_genes {
            return Err(DegError::DimensionMismatch {
                expected: format!("{} gene rows", n_genes),
                got: format!(
                    "{} symbols and {} probes",
                    gene_symbols.len(),
                    source_probes.len()
                ),
            });
        }
        if sample_ids.len() != n_samples {
            return Err(DegError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }
        // gene_index binary-searches the symbols
        if let Some(pair) = gene_symbols.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DegError::InvalidInput {
                reason: format!(
                    "gene symbols must be sorted and unique; '{}' is followed by '{}'",
                    pair[0], pair[1]
                ),
            });
        }
        Ok(Self {
            values,
            gene_symbols,
            source_probes,
            sample_ids,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn gene_symbols(&self) -> &[String] {
        &self.gene_symbols
    }

    /// Probe each gene row was taken from
    pub fn source_probes(&self) -> &[String] {
        &self.source_probes
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn gene_values(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(gene_idx)
    }

    pub fn gene_index(&self, symbol: &str) -> Option<usize> {
        self.gene_symbols
            .binary_search_by(|s| s.as_str().cmp(symbol))
            .ok()
    }
}

/// Relabel probes with gene symbols and keep one probe per gene.
///
/// Unmapped probes and probes with any missing intensity are discarded.
/// Ties on the rule's score keep the probe that appears first in the matrix.
pub fn collapse_probes(
    matrix: &ExpressionMatrix,
    annotation: &ProbeAnnotation,
    rule: CollapseRule,
) -> Result<GeneMatrix> {
    let mut best: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    let mut n_unmapped = 0usize;
    let mut n_incomplete = 0usize;

    for (probe_idx, probe_id) in matrix.probe_ids().iter().enumerate() {
        let symbol = match annotation.gene_symbol(probe_id) {
            Some(s) => s,
            None => {
                n_unmapped += 1;
                continue;
            }
        };
        if !matrix.is_complete(probe_idx) {
            n_incomplete += 1;
            continue;
        }

        let score = rule.score(matrix.probe_values(probe_idx));
        match best.get_mut(symbol) {
            Some(entry) => {
                if score > entry.1 {
                    *entry = (probe_idx, score);
                }
            }
            None => {
                best.insert(symbol, (probe_idx, score));
            }
        }
    }

    if n_unmapped > 0 {
        log::info!("  discarded {} probes without a gene symbol", n_unmapped);
    }
    if n_incomplete > 0 {
        log::warn!("Discarded {} probes with missing intensities", n_incomplete);
    }

    if best.is_empty() {
        return Err(DegError::EmptyData {
            reason: "no annotated probe with complete intensities".to_string(),
        });
    }

    let n_samples = matrix.n_samples();
    let mut values = Array2::zeros((best.len(), n_samples));
    let mut gene_symbols = Vec::with_capacity(best.len());
    let mut source_probes = Vec::with_capacity(best.len());

    for (row, (symbol, (probe_idx, _))) in best.iter().enumerate() {
        values.row_mut(row).assign(&matrix.probe_values(*probe_idx));
        gene_symbols.push(symbol.to_string());
        source_probes.push(matrix.probe_ids()[*probe_idx].clone());
    }

    log::debug!(
        "Collapsed {} probes to {} genes ({})",
        matrix.n_probes(),
        gene_symbols.len(),
        rule
    );

    GeneMatrix::new(values, gene_symbols, source_probes, matrix.sample_ids().to_vec())
}
