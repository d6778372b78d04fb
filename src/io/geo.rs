//! GEO series matrix and platform annotation parsing
//!
//! Both files are gzip-compressed, tab-delimited text with `!`-prefixed
//! metadata lines around a single table delimited by begin/end markers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use ndarray::Array2;

use super::csv::parse_intensity;
use crate::data::{ExpressionMatrix, ProbeAnnotation, SampleMetadata};
use crate::error::{DegError, Result};

const SERIES_TABLE_BEGIN: &str = "!series_matrix_table_begin";
const SERIES_TABLE_END: &str = "!series_matrix_table_end";
const PLATFORM_TABLE_BEGIN: &str = "!platform_table_begin";
const PLATFORM_TABLE_END: &str = "!platform_table_end";

const SYMBOL_COLUMNS: [&str; 5] = ["Gene symbol", "gene_symbol", "GENE_SYMBOL", "Gene.symbol", "Symbol"];
const ENTREZ_COLUMNS: [&str; 4] = ["Gene ID", "ENTREZ_GENE_ID", "Entrez Gene", "EntrezID"];

/// Label written for samples whose characteristics carry no normal flag
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Contents of a parsed series matrix
#[derive(Debug, Clone)]
pub struct SeriesMatrix {
    pub expression: ExpressionMatrix,
    pub metadata: SampleMetadata,
}

/// Decompress a gzip file into text, replacing invalid UTF-8
pub fn read_gz_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split('\t')
        .map(|f| f.trim().trim_matches('"').to_string())
        .collect()
}

/// Lines strictly between the begin and end markers
fn table_lines<'a>(lines: &[&'a str], begin: &str, end: &str, file: &str) -> Result<Vec<&'a str>> {
    let start = lines
        .iter()
        .position(|l| l.starts_with(begin))
        .ok_or_else(|| DegError::MissingSection {
            marker: begin.to_string(),
            file: file.to_string(),
        })?;
    let stop = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with(end))
        .map(|p| p + start + 1)
        .ok_or_else(|| DegError::MissingSection {
            marker: end.to_string(),
            file: file.to_string(),
        })?;

    Ok(lines[start + 1..stop]
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .collect())
}

/// Tumor / Normal from one characteristics cell (`normal: yes` / `normal: no`)
fn characteristic_label(cell: &str) -> &'static str {
    let cell = cell.replace('"', "").trim().to_lowercase();
    if cell.contains("normal: yes") {
        "Normal"
    } else if cell.contains("normal: no") {
        "Tumor"
    } else {
        UNKNOWN_LABEL
    }
}

fn parse_sample_metadata(lines: &[&str]) -> Result<SampleMetadata> {
    let sample_ids = lines
        .iter()
        .find(|l| l.starts_with("!Sample_geo_accession"))
        .map(|l| split_fields(l).into_iter().skip(1).collect::<Vec<_>>())
        .ok_or_else(|| DegError::MissingSection {
            marker: "!Sample_geo_accession".to_string(),
            file: "series matrix".to_string(),
        })?;

    // Prefer the characteristics row that carries the normal flag
    let characteristics: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("!Sample_characteristics_ch1"))
        .collect();
    let row = characteristics
        .iter()
        .find(|l| l.to_lowercase().contains("normal:"))
        .or_else(|| characteristics.first());

    let labels: Vec<String> = match row {
        Some(line) => split_fields(line)
            .iter()
            .skip(1)
            .map(|c| characteristic_label(c).to_string())
            .collect(),
        None => {
            log::warn!("Series matrix has no sample characteristics; all samples labeled {}", UNKNOWN_LABEL);
            vec![UNKNOWN_LABEL.to_string(); sample_ids.len()]
        }
    };

    SampleMetadata::new(sample_ids, labels)
}

/// Parse the text of a series matrix file
pub fn parse_series_matrix(text: &str) -> Result<SeriesMatrix> {
    let lines: Vec<&str> = text.lines().collect();
    let table = table_lines(&lines, SERIES_TABLE_BEGIN, SERIES_TABLE_END, "series matrix")?;

    let (header, rows) = table.split_first().ok_or_else(|| DegError::EmptyData {
        reason: "series matrix table has no header".to_string(),
    })?;
    let header = split_fields(header);
    if header.len() < 2 {
        return Err(DegError::InvalidExpressionMatrix {
            reason: "series matrix table has no sample columns".to_string(),
        });
    }
    let sample_ids: Vec<String> = header[1..].to_vec();
    let n_samples = sample_ids.len();

    let mut probe_ids = Vec::with_capacity(rows.len());
    let mut data = Vec::with_capacity(rows.len() * n_samples);
    for row in rows {
        let fields = split_fields(row);
        if fields.len() != n_samples + 1 {
            return Err(DegError::InvalidExpressionMatrix {
                reason: format!(
                    "probe '{}' has {} columns, expected {}",
                    fields[0],
                    fields.len(),
                    n_samples + 1
                ),
            });
        }
        for cell in &fields[1..] {
            data.push(parse_intensity(cell)?);
        }
        probe_ids.push(fields[0].clone());
    }

    if probe_ids.is_empty() {
        return Err(DegError::EmptyData {
            reason: "series matrix table has no probes".to_string(),
        });
    }

    let values = Array2::from_shape_vec((probe_ids.len(), n_samples), data).map_err(|e| {
        DegError::InvalidExpressionMatrix {
            reason: e.to_string(),
        }
    })?;
    let expression = ExpressionMatrix::new(values, probe_ids, sample_ids)?;
    let metadata = parse_sample_metadata(&lines)?;

    Ok(SeriesMatrix { expression, metadata })
}

/// Parse the text of a platform annotation (`.annot`) file
pub fn parse_platform_annotation(text: &str) -> Result<ProbeAnnotation> {
    let lines: Vec<&str> = text.lines().collect();
    let table = table_lines(&lines, PLATFORM_TABLE_BEGIN, PLATFORM_TABLE_END, "platform annotation")?;

    let (header, rows) = table.split_first().ok_or_else(|| DegError::EmptyData {
        reason: "platform table has no header".to_string(),
    })?;
    let header = split_fields(header);

    let column = |names: &[&str]| names.iter().find_map(|n| header.iter().position(|h| h == n));
    let id_col = header.iter().position(|h| h == "ID").unwrap_or(0);
    let symbol_col = column(&SYMBOL_COLUMNS[..]).ok_or_else(|| DegError::InvalidAnnotation {
        reason: "No gene symbol column found in annotation file".to_string(),
    })?;
    let entrez_col = column(&ENTREZ_COLUMNS[..]);
    if entrez_col.is_none() {
        log::warn!("No Entrez ID column found; filling with NA");
    }

    let mut annotation = ProbeAnnotation::new();
    for row in rows {
        let fields = split_fields(row);
        let get = |i: usize| fields.get(i).map(|s| s.as_str()).unwrap_or("");
        annotation.insert(get(id_col), get(symbol_col), entrez_col.map_or("", get))?;
    }

    if annotation.n_probes() == 0 {
        return Err(DegError::EmptyData {
            reason: "platform table has no probes".to_string(),
        });
    }
    Ok(annotation)
}

pub fn read_series_matrix<P: AsRef<Path>>(path: P) -> Result<SeriesMatrix> {
    parse_series_matrix(&read_gz_text(path)?)
}

pub fn read_platform_annotation<P: AsRef<Path>>(path: P) -> Result<ProbeAnnotation> {
    parse_platform_annotation(&read_gz_text(path)?)
}
