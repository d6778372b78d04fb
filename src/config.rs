//! Run configuration: thresholds, engine switches, directory layout and sources

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::CollapseRule;
use crate::error::{DegError, Result};

/// GEO series accession of the colorectal cohort
pub const SERIES_ACCESSION: &str = "GSE103512";
/// GEO platform accession (Affymetrix HT HG-U133+ PM)
pub const PLATFORM_ACCESSION: &str = "GPL13158";

pub const SERIES_MATRIX_FILE: &str = "GSE103512_series_matrix.txt.gz";
pub const PLATFORM_ANNOT_FILE: &str = "GPL13158.annot.gz";

/// Parameters of the differential expression engine and figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum |log2FC| for a gene to be called up or down (strict)
    pub lfc_threshold: f64,
    /// Adjusted p-value cutoff (strict)
    pub padj_threshold: f64,
    /// Added to group means before taking log2
    pub pseudocount: f64,
    /// Pooled-variance Student's t instead of Welch
    pub equal_variance: bool,
    /// Input intensities are already log2 scaled; fold change becomes a difference of means
    pub log2_input: bool,
    /// Representative probe selection
    pub collapse_rule: CollapseRule,
    /// Cap on heatmap rows (smallest adjusted p first); None keeps every significant gene
    pub heatmap_max_genes: Option<usize>,
    /// Drop samples whose label is neither Tumor nor Normal instead of failing
    pub drop_unlabeled: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lfc_threshold: 1.5,
            padj_threshold: 0.05,
            pseudocount: 1e-9,
            equal_variance: false,
            log2_input: false,
            collapse_rule: CollapseRule::MaxMean,
            heatmap_max_genes: None,
            drop_unlabeled: false,
        }
    }
}

impl AnalysisConfig {
    /// Reject thresholds that make classification meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.lfc_threshold.is_finite() && self.lfc_threshold >= 0.0) {
            return Err(DegError::InvalidInput {
                reason: format!("lfc_threshold must be >= 0, got {}", self.lfc_threshold),
            });
        }
        if !(self.padj_threshold > 0.0 && self.padj_threshold <= 1.0) {
            return Err(DegError::InvalidInput {
                reason: format!("padj_threshold must be in (0, 1], got {}", self.padj_threshold),
            });
        }
        if !(self.pseudocount.is_finite() && self.pseudocount >= 0.0) {
            return Err(DegError::InvalidInput {
                reason: format!("pseudocount must be >= 0, got {}", self.pseudocount),
            });
        }
        if self.heatmap_max_genes == Some(0) {
            return Err(DegError::InvalidInput {
                reason: "heatmap_max_genes must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The two remote files fetched by the download step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceUrls {
    pub series_matrix: String,
    pub platform_annotation: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            series_matrix: format!(
                "https://ftp.ncbi.nlm.nih.gov/geo/series/GSE103nnn/{}/matrix/{}",
                SERIES_ACCESSION, SERIES_MATRIX_FILE
            ),
            platform_annotation: format!(
                "https://ftp.ncbi.nlm.nih.gov/geo/platforms/GPL13nnn/{}/annot/{}",
                PLATFORM_ACCESSION, PLATFORM_ANNOT_FILE
            ),
        }
    }
}

/// Configuration file contents (`--config`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub sources: SourceUrls,
}

impl PipelineConfig {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// On-disk layout: `<data>/Raw`, `<data>/Processed` and a results directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("Data", "Results")
    }
}

impl DataLayout {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(data_dir: P, results_dir: Q) -> Self {
        Self {
            data_dir: data_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("Raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("Processed")
    }

    pub fn series_matrix(&self) -> PathBuf {
        self.raw_dir().join(SERIES_MATRIX_FILE)
    }

    pub fn platform_annotation(&self) -> PathBuf {
        self.raw_dir().join(PLATFORM_ANNOT_FILE)
    }

    pub fn expression_csv(&self) -> PathBuf {
        self.processed_dir().join("raw_counts.csv")
    }

    pub fn annotation_csv(&self) -> PathBuf {
        self.processed_dir().join("probe_to_gene.csv")
    }

    pub fn metadata_csv(&self) -> PathBuf {
        self.processed_dir().join("metadata.csv")
    }

    pub fn results_csv(&self) -> PathBuf {
        self.results_dir.join("deg_results.csv")
    }

    pub fn significant_csv(&self) -> PathBuf {
        self.results_dir.join("significant_degs.csv")
    }

    pub fn volcano_svg(&self) -> PathBuf {
        self.results_dir.join("volcano_plot.svg")
    }

    pub fn heatmap_svg(&self) -> PathBuf {
        self.results_dir.join("heatmap.svg")
    }

    pub fn summary_json(&self) -> PathBuf {
        self.results_dir.join("summary.json")
    }
}
