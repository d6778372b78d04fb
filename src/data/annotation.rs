//! Probe to gene symbol annotation

use std::collections::HashMap;

use crate::error::{DegError, Result};

/// One platform row: probe, gene symbol, Entrez gene ID
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    pub probe_id: String,
    pub gene_symbol: Option<String>,
    pub entrez_id: Option<String>,
}

/// Many-to-one mapping from probe IDs to gene symbols
#[derive(Debug, Clone, Default)]
pub struct ProbeAnnotation {
    records: Vec<ProbeRecord>,
    index: HashMap<String, usize>,
}

fn normalize_field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("NA") || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

impl ProbeAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a probe. Empty or `NA` symbols leave the probe unmapped.
    pub fn insert(&mut self, probe_id: &str, gene_symbol: &str, entrez_id: &str) -> Result<()> {
        let probe_id = probe_id.trim();
        if probe_id.is_empty() {
            return Err(DegError::InvalidAnnotation {
                reason: "empty probe ID".to_string(),
            });
        }
        if self.index.contains_key(probe_id) {
            return Err(DegError::InvalidAnnotation {
                reason: format!("probe '{}' annotated twice", probe_id),
            });
        }

        self.index.insert(probe_id.to_string(), self.records.len());
        self.records.push(ProbeRecord {
            probe_id: probe_id.to_string(),
            gene_symbol: normalize_field(gene_symbol),
            entrez_id: normalize_field(entrez_id),
        });
        Ok(())
    }

    /// Gene symbol for a probe, if mapped
    pub fn gene_symbol(&self, probe_id: &str) -> Option<&str> {
        self.index
            .get(probe_id)
            .and_then(|&i| self.records[i].gene_symbol.as_deref())
    }

    pub fn records(&self) -> &[ProbeRecord] {
        &self.records
    }

    pub fn n_probes(&self) -> usize {
        self.records.len()
    }

    /// Number of probes carrying a gene symbol
    pub fn n_mapped(&self) -> usize {
        self.records.iter().filter(|r| r.gene_symbol.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_lookup() {
        let mut annot = ProbeAnnotation::new();
        annot.insert("1007_PM_s_at", "DDR1 /// MIR4640", "780").unwrap();
        annot.insert("AFFX-BioB-5_at", "", "").unwrap();
        annot.insert("1552256_PM_a_at", "SCARB1", "NA").unwrap();

        assert_eq!(annot.gene_symbol("1007_PM_s_at"), Some("DDR1 /// MIR4640"));
        assert_eq!(annot.gene_symbol("AFFX-BioB-5_at"), None);
        assert_eq!(annot.gene_symbol("missing"), None);
        assert_eq!(annot.n_probes(), 3);
        assert_eq!(annot.n_mapped(), 2);
        assert_eq!(annot.records()[2].entrez_id, None);
    }

    #[test]
    fn test_duplicate_probe_rejected() {
        let mut annot = ProbeAnnotation::new();
        annot.insert("p1", "A", "1").unwrap();
        assert!(annot.insert("p1", "B", "2").is_err());
    }
}
