//! CSV reading and writing for the processed tables and DEG results

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::Array2;

use super::results::{DegRecord, DegResults};
use crate::data::{ExpressionMatrix, ProbeAnnotation, SampleMetadata};
use crate::error::{DegError, Result};

const RESULT_HEADER: [&str; 11] = [
    "Gene Symbol",
    "ProbeID",
    "meanTumor",
    "meanNormal",
    "log2FoldChange",
    "tStat",
    "df",
    "pvalue",
    "padj",
    "Regulation",
    "UndefinedStat",
];

/// Tab if the header line contains one, else comma
fn detect_delimiter(path: &Path) -> Result<u8> {
    let mut first = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first)?;
    if first.trim().is_empty() {
        return Err(DegError::EmptyData {
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(if first.contains('\t') { b'\t' } else { b',' })
}

fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder.terminator(csv::Terminator::Any(b'\n'));
    builder
}

fn reader_for(path: &Path) -> Result<csv::Reader<File>> {
    let delimiter = detect_delimiter(path)?;
    Ok(ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_path(path)?)
}

/// Parse an intensity cell; `null`, `NA`, `NaN` and empty cells are missing
pub(crate) fn parse_intensity(cell: &str) -> Result<f64> {
    let cell = cell.trim().trim_matches('"');
    if cell.is_empty()
        || cell.eq_ignore_ascii_case("null")
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("nan")
    {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| DegError::InvalidExpressionMatrix {
        reason: format!("Invalid intensity value: {}", cell),
    })
}

fn fmt_fixed(x: f64) -> String {
    if x.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.6}", x)
    }
}

fn fmt_sci(x: f64) -> String {
    if x.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.6e}", x)
    }
}

/// Read an expression matrix
/// Expected format: first column is probe IDs, first row is sample IDs
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let mut reader = reader_for(path.as_ref())?;

    let header = reader.headers()?.clone();
    if header.len() < 2 {
        return Err(DegError::InvalidExpressionMatrix {
            reason: "Not enough columns in header".to_string(),
        });
    }
    let sample_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim_matches('"').to_string()).collect();
    let n_samples = sample_ids.len();

    let mut probe_ids = Vec::new();
    let mut data: Vec<f64> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        probe_ids.push(record[0].trim_matches('"').to_string());
        for cell in record.iter().skip(1) {
            data.push(parse_intensity(cell)?);
        }
    }

    if probe_ids.is_empty() {
        return Err(DegError::EmptyData {
            reason: "No probes found in expression matrix".to_string(),
        });
    }

    let values = Array2::from_shape_vec((probe_ids.len(), n_samples), data).map_err(|e| {
        DegError::InvalidExpressionMatrix {
            reason: e.to_string(),
        }
    })?;
    ExpressionMatrix::new(values, probe_ids, sample_ids)
}

/// Read the probe annotation
/// Expected columns: probe ID, gene symbol, optional Entrez gene ID
pub fn read_annotation<P: AsRef<Path>>(path: P) -> Result<ProbeAnnotation> {
    let mut reader = reader_for(path.as_ref())?;
    if reader.headers()?.len() < 2 {
        return Err(DegError::InvalidAnnotation {
            reason: "annotation needs a probe and a gene symbol column".to_string(),
        });
    }

    let mut annotation = ProbeAnnotation::new();
    for record in reader.records() {
        let record = record?;
        annotation.insert(
            record.get(0).unwrap_or(""),
            record.get(1).unwrap_or(""),
            record.get(2).unwrap_or(""),
        )?;
    }

    if annotation.n_probes() == 0 {
        return Err(DegError::EmptyData {
            reason: "No probes found in annotation".to_string(),
        });
    }
    Ok(annotation)
}

/// Read sample metadata
/// First column is the sample ID; the group column is `SampleType` or
/// `group` when present, otherwise the second column.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let mut reader = reader_for(path.as_ref())?;
    let header = reader.headers()?.clone();
    if header.len() < 2 {
        return Err(DegError::InvalidMetadata {
            reason: "metadata needs a sample ID and a group column".to_string(),
        });
    }

    let group_col = header
        .iter()
        .position(|h| h.eq_ignore_ascii_case("SampleType") || h.eq_ignore_ascii_case("group"))
        .unwrap_or(1);

    let mut sample_ids = Vec::new();
    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        sample_ids.push(record[0].to_string());
        labels.push(record.get(group_col).unwrap_or("").to_string());
    }

    if sample_ids.is_empty() {
        return Err(DegError::EmptyData {
            reason: "No samples found in metadata".to_string(),
        });
    }
    SampleMetadata::new(sample_ids, labels)
}

/// Write an expression matrix as CSV (`ProbeID` + sample columns)
pub fn write_expression_matrix<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    let mut writer = writer_builder().from_path(path)?;

    let mut header = vec!["ProbeID".to_string()];
    header.extend(matrix.sample_ids().iter().cloned());
    writer.write_record(&header)?;

    for (i, probe) in matrix.probe_ids().iter().enumerate() {
        let mut row = Vec::with_capacity(matrix.n_samples() + 1);
        row.push(probe.clone());
        row.extend(matrix.probe_values(i).iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the probe annotation as CSV
pub fn write_annotation<P: AsRef<Path>>(path: P, annotation: &ProbeAnnotation) -> Result<()> {
    let mut writer = writer_builder().from_path(path)?;
    writer.write_record(["ProbeID", "Gene Symbol", "ENTREZ_GENE_ID"])?;
    for rec in annotation.records() {
        writer.write_record([
            rec.probe_id.as_str(),
            rec.gene_symbol.as_deref().unwrap_or(""),
            rec.entrez_id.as_deref().unwrap_or("NA"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write sample metadata as CSV (`SampleID,SampleType`)
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &SampleMetadata) -> Result<()> {
    let mut writer = writer_builder().from_path(path)?;
    writer.write_record(["SampleID", "SampleType"])?;
    for (id, label) in metadata.sample_ids().iter().zip(metadata.labels()) {
        writer.write_record([id, label])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_records<'a, W: Write, I: IntoIterator<Item = &'a DegRecord>>(out: W, records: I) -> Result<()> {
    let mut writer = writer_builder().from_writer(out);
    writer.write_record(RESULT_HEADER)?;
    for r in records {
        writer.write_record([
            r.gene_symbol.clone(),
            r.probe_id.clone(),
            fmt_fixed(r.mean_tumor),
            fmt_fixed(r.mean_normal),
            fmt_fixed(r.log2_fold_change),
            fmt_fixed(r.t_statistic),
            fmt_fixed(r.df),
            fmt_sci(r.pvalue),
            fmt_sci(r.padj),
            r.regulation.to_string(),
            r.undefined_stat.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full DEG table in gene matrix order
pub fn write_results<P: AsRef<Path>>(path: P, results: &DegResults) -> Result<()> {
    write_records(File::create(path)?, &results.records)
}

/// Write Up/Down genes ordered by adjusted p
pub fn write_significant<P: AsRef<Path>>(path: P, results: &DegResults) -> Result<()> {
    write_records(File::create(path)?, results.significant_ranked())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Regulation;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expression_matrix_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ProbeID\tGSM1\tGSM2\tGSM3").unwrap();
        writeln!(file, "p1\t7.5\t8.25\tnull").unwrap();
        writeln!(file, "p2\t5\t6\t7").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_probes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert!(matrix.values()[[0, 2]].is_nan());
        assert_eq!(matrix.values()[[1, 0]], 5.0);
    }

    #[test]
    fn test_read_expression_matrix_rejects_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ProbeID,GSM1").unwrap();
        writeln!(file, "p1,high").unwrap();
        assert!(read_expression_matrix(file.path()).is_err());
    }

    #[test]
    fn test_expression_round_trip_keeps_values() {
        let mut src = NamedTempFile::new().unwrap();
        writeln!(src, "ProbeID,GSM1,GSM2").unwrap();
        writeln!(src, "p1,0.1,").unwrap();
        let matrix = read_expression_matrix(src.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        write_expression_matrix(out.path(), &matrix).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text, "ProbeID,GSM1,GSM2\np1,0.1,\n");
    }

    #[test]
    fn test_read_metadata_group_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "SampleID,Batch,SampleType").unwrap();
        writeln!(file, "GSM1,b1,Tumor").unwrap();
        writeln!(file, "GSM2,b1,Normal").unwrap();

        let meta = read_metadata(file.path()).unwrap();
        assert_eq!(meta.labels(), &["Tumor".to_string(), "Normal".to_string()]);
    }

    #[test]
    fn test_read_annotation_quoted_symbols() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ProbeID,Gene Symbol,ENTREZ_GENE_ID").unwrap();
        writeln!(file, "p1,\"DDR1 /// MIR4640\",780").unwrap();
        writeln!(file, "p2,,NA").unwrap();

        let annot = read_annotation(file.path()).unwrap();
        assert_eq!(annot.gene_symbol("p1"), Some("DDR1 /// MIR4640"));
        assert_eq!(annot.gene_symbol("p2"), None);
    }

    #[test]
    fn test_write_results_format() {
        let results = DegResults {
            records: vec![DegRecord {
                gene_symbol: "CDH3".to_string(),
                probe_id: "p1".to_string(),
                mean_tumor: 8.0,
                mean_normal: 2.0,
                log2_fold_change: 2.0,
                t_statistic: f64::NAN,
                df: f64::NAN,
                pvalue: 1.0,
                padj: 1.0,
                regulation: Regulation::NotSignificant,
                undefined_stat: true,
            }],
            n_tumor: 2,
            n_normal: 2,
            lfc_threshold: 1.5,
            padj_threshold: 0.05,
        };

        let out = NamedTempFile::new().unwrap();
        write_results(out.path(), &results).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Gene Symbol,ProbeID,meanTumor,meanNormal,log2FoldChange,tStat,df,pvalue,padj,Regulation,UndefinedStat"
        );
        assert_eq!(
            lines.next().unwrap(),
            "CDH3,p1,8.000000,2.000000,2.000000,NA,NA,1.000000e0,1.000000e0,Not Significant,true"
        );
    }
}
