//! Sample group labels (Tumor / Normal)

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DegError, Result};

/// Biological group of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SampleGroup {
    Normal,
    Tumor,
}

impl SampleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleGroup::Normal => "Normal",
            SampleGroup::Tumor => "Tumor",
        }
    }
}

impl fmt::Display for SampleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleGroup {
    type Err = DegError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tumor" | "tumour" | "cancer" => Ok(SampleGroup::Tumor),
            "normal" | "control" => Ok(SampleGroup::Normal),
            other => Err(DegError::InvalidMetadata {
                reason: format!("unrecognized group label '{}'", other),
            }),
        }
    }
}

/// Sample metadata as authored (labels kept verbatim until alignment)
#[derive(Debug, Clone)]
pub struct SampleMetadata {
    sample_ids: Vec<String>,
    labels: Vec<String>,
}

impl SampleMetadata {
    pub fn new(sample_ids: Vec<String>, labels: Vec<String>) -> Result<Self> {
        if sample_ids.len() != labels.len() {
            return Err(DegError::DimensionMismatch {
                expected: format!("{} labels", sample_ids.len()),
                got: format!("{} labels", labels.len()),
            });
        }

        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id) {
                return Err(DegError::InvalidMetadata {
                    reason: format!("duplicate sample ID '{}'", id),
                });
            }
        }

        Ok(Self { sample_ids, labels })
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Count of samples per raw label, sorted by label
    pub fn label_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for label in &self.labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        counts.sort();
        counts
    }

    /// Resolve a group for every expression column.
    ///
    /// Every column must have a metadata row. Rows whose label is neither
    /// Tumor nor Normal fail the alignment unless `drop_unlabeled` is set, in
    /// which case those columns are left out of the returned design.
    pub fn align(&self, column_ids: &[String], drop_unlabeled: bool) -> Result<GroupDesign> {
        let lookup: HashMap<&str, &str> = self
            .sample_ids
            .iter()
            .map(|s| s.as_str())
            .zip(self.labels.iter().map(|s| s.as_str()))
            .collect();

        let missing: Vec<&str> = column_ids
            .iter()
            .map(|s| s.as_str())
            .filter(|id| !lookup.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(DegError::InvalidMetadata {
                reason: format!(
                    "{} expression samples have no metadata row: {:?}",
                    missing.len(),
                    missing
                ),
            });
        }

        let extra = self
            .sample_ids
            .iter()
            .filter(|id| !column_ids.contains(id))
            .count();
        if extra > 0 {
            log::warn!("{} metadata rows do not match any expression sample", extra);
        }

        let mut columns = Vec::new();
        let mut groups = Vec::new();
        let mut unlabeled = Vec::new();
        for (col, id) in column_ids.iter().enumerate() {
            match lookup[id.as_str()].parse::<SampleGroup>() {
                Ok(group) => {
                    columns.push(col);
                    groups.push(group);
                }
                Err(_) => unlabeled.push(id.as_str()),
            }
        }

        if !unlabeled.is_empty() {
            if drop_unlabeled {
                log::warn!(
                    "Dropping {} samples without a Tumor/Normal label",
                    unlabeled.len()
                );
            } else {
                return Err(DegError::InvalidMetadata {
                    reason: format!(
                        "{} samples are neither Tumor nor Normal: {:?}",
                        unlabeled.len(),
                        unlabeled
                    ),
                });
            }
        }

        Ok(GroupDesign { columns, groups })
    }
}

/// Expression columns used in the comparison and their groups
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDesign {
    /// Column indices into the expression matrix
    pub columns: Vec<usize>,
    /// Group of each retained column
    pub groups: Vec<SampleGroup>,
}

impl GroupDesign {
    pub fn n_samples(&self) -> usize {
        self.groups.len()
    }

    /// Positions (within the retained columns) belonging to `group`
    pub fn indices_of(&self, group: SampleGroup) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == group)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, group: SampleGroup) -> usize {
        self.groups.iter().filter(|g| **g == group).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_group_parsing() {
        assert_eq!("Tumor".parse::<SampleGroup>().unwrap(), SampleGroup::Tumor);
        assert_eq!(" normal ".parse::<SampleGroup>().unwrap(), SampleGroup::Normal);
        assert!("Unknown".parse::<SampleGroup>().is_err());
    }

    #[test]
    fn test_align_reorders_to_columns() {
        let meta = SampleMetadata::new(
            strings(&["GSM2", "GSM1", "GSM3"]),
            strings(&["Normal", "Tumor", "Tumor"]),
        )
        .unwrap();

        let design = meta.align(&strings(&["GSM1", "GSM2", "GSM3"]), false).unwrap();
        assert_eq!(design.columns, vec![0, 1, 2]);
        assert_eq!(
            design.groups,
            vec![SampleGroup::Tumor, SampleGroup::Normal, SampleGroup::Tumor]
        );
        assert_eq!(design.indices_of(SampleGroup::Tumor), vec![0, 2]);
    }

    #[test]
    fn test_align_fails_on_uncovered_sample() {
        let meta = SampleMetadata::new(strings(&["GSM1"]), strings(&["Tumor"])).unwrap();
        let result = meta.align(&strings(&["GSM1", "GSM9"]), false);
        assert!(matches!(result, Err(DegError::InvalidMetadata { .. })));
    }

    #[test]
    fn test_unknown_labels() {
        let meta = SampleMetadata::new(
            strings(&["GSM1", "GSM2", "GSM3"]),
            strings(&["Tumor", "Unknown", "Normal"]),
        )
        .unwrap();
        let cols = strings(&["GSM1", "GSM2", "GSM3"]);

        assert!(meta.align(&cols, false).is_err());

        let design = meta.align(&cols, true).unwrap();
        assert_eq!(design.columns, vec![0, 2]);
        assert_eq!(design.count(SampleGroup::Normal), 1);
    }

    #[test]
    fn test_duplicate_sample_rejected() {
        let result = SampleMetadata::new(strings(&["GSM1", "GSM1"]), strings(&["Tumor", "Normal"]));
        assert!(result.is_err());
    }
}
