//! Probe-level expression matrix

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{DegError, Result};

/// Normalized microarray intensities
/// Rows are probes, columns are samples; missing cells are NaN
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    /// Intensities (probes x samples)
    values: Array2<f64>,
    /// Probe identifiers
    probe_ids: Vec<String>,
    /// Sample identifiers (GSM accessions)
    sample_ids: Vec<String>,
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str())).map(|s| s.as_str())
}

impl ExpressionMatrix {
    /// Create a new expression matrix; probe and sample IDs must be unique
    pub fn new(values: Array2<f64>, probe_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (n_probes, n_samples) = values.dim();

        if probe_ids.len() != n_probes {
            return Err(DegError::DimensionMismatch {
                expected: format!("{} probe IDs", n_probes),
                got: format!("{} probe IDs", probe_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(DegError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if let Some(dup) = first_duplicate(&probe_ids) {
            return Err(DegError::InvalidExpressionMatrix {
                reason: format!("duplicate probe ID '{}'", dup),
            });
        }

        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(DegError::InvalidExpressionMatrix {
                reason: format!("duplicate sample ID '{}'", dup),
            });
        }

        if values.iter().any(|x| x.is_infinite()) {
            return Err(DegError::InvalidExpressionMatrix {
                reason: "intensities must be finite or missing".to_string(),
            });
        }

        Ok(Self {
            values,
            probe_ids,
            sample_ids,
        })
    }

    pub fn n_probes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn probe_ids(&self) -> &[String] {
        &self.probe_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Intensities of one probe across samples
    pub fn probe_values(&self, probe_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(probe_idx)
    }

    /// True when the probe has no missing cell
    pub fn is_complete(&self, probe_idx: usize) -> bool {
        self.values.row(probe_idx).iter().all(|x| x.is_finite())
    }
}
