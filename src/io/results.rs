//! DEG result table

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction call for one gene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regulation {
    #[serde(rename = "Upregulated")]
    Up,
    #[serde(rename = "Downregulated")]
    Down,
    #[serde(rename = "Not Significant")]
    NotSignificant,
}

impl Regulation {
    /// Pure threshold rule on (log2FC, adjusted p); both comparisons are strict
    pub fn classify(log2_fold_change: f64, padj: f64, lfc_threshold: f64, padj_threshold: f64) -> Self {
        if !(padj < padj_threshold) {
            return Regulation::NotSignificant;
        }
        if log2_fold_change > lfc_threshold {
            Regulation::Up
        } else if log2_fold_change < -lfc_threshold {
            Regulation::Down
        } else {
            Regulation::NotSignificant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Regulation::Up => "Upregulated",
            Regulation::Down => "Downregulated",
            Regulation::NotSignificant => "Not Significant",
        }
    }

    pub fn is_significant(&self) -> bool {
        *self != Regulation::NotSignificant
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the DEG table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegRecord {
    pub gene_symbol: String,
    /// Probe the gene's intensities were taken from
    pub probe_id: String,
    pub mean_tumor: f64,
    pub mean_normal: f64,
    pub log2_fold_change: f64,
    /// NaN when the statistic is undefined
    pub t_statistic: f64,
    pub df: f64,
    /// 1.0 for undefined statistics
    pub pvalue: f64,
    pub padj: f64,
    pub regulation: Regulation,
    /// Zero variance in a group or non-finite fold change
    pub undefined_stat: bool,
}

/// Results of the tumor vs normal comparison, in gene matrix order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegResults {
    pub records: Vec<DegRecord>,
    pub n_tumor: usize,
    pub n_normal: usize,
    pub lfc_threshold: f64,
    pub padj_threshold: f64,
}

impl DegResults {
    pub fn n_genes(&self) -> usize {
        self.records.len()
    }

    /// Up- and down-regulated genes
    pub fn significant(&self) -> Vec<&DegRecord> {
        self.records
            .iter()
            .filter(|r| r.regulation.is_significant())
            .collect()
    }

    /// Positions in `records` of the significant genes, by ascending
    /// adjusted p with ties by symbol
    pub fn significant_positions(&self) -> Vec<usize> {
        let mut sig: Vec<usize> = (0..self.records.len())
            .filter(|&i| self.records[i].regulation.is_significant())
            .collect();
        sig.sort_by(|&a, &b| {
            let (a, b) = (&self.records[a], &self.records[b]);
            a.padj
                .total_cmp(&b.padj)
                .then_with(|| a.gene_symbol.cmp(&b.gene_symbol))
        });
        sig
    }

    /// Significant genes by ascending adjusted p, ties by symbol
    pub fn significant_ranked(&self) -> Vec<&DegRecord> {
        self.significant_positions()
            .into_iter()
            .map(|i| &self.records[i])
            .collect()
    }

    pub fn count(&self, regulation: Regulation) -> usize {
        self.records.iter().filter(|r| r.regulation == regulation).count()
    }

    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary {
            total_genes: self.n_genes(),
            genes_tested: self.records.iter().filter(|r| !r.undefined_stat).count(),
            undefined: self.records.iter().filter(|r| r.undefined_stat).count(),
            upregulated: self.count(Regulation::Up),
            downregulated: self.count(Regulation::Down),
            n_tumor: self.n_tumor,
            n_normal: self.n_normal,
            lfc_threshold: self.lfc_threshold,
            padj_threshold: self.padj_threshold,
        }
    }
}

/// Summary of a DEG run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub undefined: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub n_tumor: usize,
    pub n_normal: usize,
    pub lfc_threshold: f64,
    pub padj_threshold: f64,
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tumor vs Normal DEG Summary")?;
        writeln!(f, "===========================")?;
        writeln!(f, "Samples: {} tumor, {} normal", self.n_tumor, self.n_normal)?;
        writeln!(f, "Total genes: {}", self.total_genes)?;
        writeln!(f, "Genes tested: {}", self.genes_tested)?;
        writeln!(f, "Undefined statistic (p set to 1): {}", self.undefined)?;
        writeln!(
            f,
            "Significant (|log2FC| > {}, padj < {}): {}",
            self.lfc_threshold,
            self.padj_threshold,
            self.upregulated + self.downregulated
        )?;
        writeln!(f, "  Upregulated: {}", self.upregulated)?;
        writeln!(f, "  Downregulated: {}", self.downregulated)?;
        Ok(())
    }
}
