//! crc_degs: tumor vs normal differential expression for colorectal cancer
//!
//! Downloads the GEO series GSE103512 and its platform annotation
//! (GPL13158), collapses probes to genes, tests every gene with a two-sample
//! t-test, adjusts p-values with Benjamini-Hochberg and classifies genes as
//! up- or down-regulated in tumors. Results are written as CSV tables, a
//! JSON summary, a volcano plot and a clustered heatmap.
//!
//! # Example
//!
//! ```ignore
//! use crc_degs::prelude::*;
//!
//! let layout = DataLayout::default();
//! download_all(&layout, &SourceUrls::default(), false)?;
//! prepare_data(&layout)?;
//!
//! let summary = run_analysis(
//!     layout.expression_csv(),
//!     layout.annotation_csv(),
//!     layout.metadata_csv(),
//!     &layout,
//!     &AnalysisConfig::default(),
//! )?;
//! println!("{}", summary);
//! ```

pub mod acquire;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod plot;
pub mod stats;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::acquire::download_all;
    pub use crate::config::{AnalysisConfig, DataLayout, PipelineConfig, SourceUrls};
    pub use crate::data::{
        collapse_probes, CollapseRule, ExpressionMatrix, GeneMatrix, GroupDesign, ProbeAnnotation,
        SampleGroup, SampleMetadata,
    };
    pub use crate::error::{DegError, Result};
    pub use crate::io::{
        read_annotation, read_expression_matrix, read_metadata, write_results, write_significant,
        DegRecord, DegResults, Regulation, ResultsSummary,
    };
    pub use crate::testing::{benjamini_hochberg, differential_expression};
    pub use crate::{analyze, prepare_data, run_analysis, Analysis};
}

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use prelude::*;

/// Output of one analysis, before anything is written
#[derive(Debug, Clone)]
pub struct Analysis {
    pub genes: GeneMatrix,
    pub design: GroupDesign,
    pub results: DegResults,
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    summary: &'a ResultsSummary,
    config: &'a AnalysisConfig,
}

/// Turn the raw GEO downloads into the processed CSV tables
pub fn prepare_data(layout: &DataLayout) -> Result<()> {
    let series_path = layout.series_matrix();
    info!("Loading series matrix from: {}", series_path.display());
    let series = io::read_series_matrix(&series_path)?;
    info!(
        "  {} probes, {} samples",
        series.expression.n_probes(),
        series.expression.n_samples()
    );
    for (label, n) in series.metadata.label_counts() {
        info!("  {}: {} samples", label, n);
    }

    let platform_path = layout.platform_annotation();
    info!("Loading platform annotation from: {}", platform_path.display());
    let annotation = io::read_platform_annotation(&platform_path)?;
    info!(
        "  {} probes, {} with a gene symbol",
        annotation.n_probes(),
        annotation.n_mapped()
    );

    fs::create_dir_all(layout.processed_dir())?;
    io::write_expression_matrix(layout.expression_csv(), &series.expression)?;
    io::write_annotation(layout.annotation_csv(), &annotation)?;
    io::write_metadata(layout.metadata_csv(), &series.metadata)?;
    info!("Processed tables written to: {}", layout.processed_dir().display());
    Ok(())
}

/// Collapse probes, align samples and test every gene
pub fn analyze(
    expression: &ExpressionMatrix,
    annotation: &ProbeAnnotation,
    metadata: &SampleMetadata,
    config: &AnalysisConfig,
) -> Result<Analysis> {
    config.validate()?;

    info!("Collapsing probes to genes ({})...", config.collapse_rule);
    let genes = collapse_probes(expression, annotation, config.collapse_rule)?;
    info!("  {} genes", genes.n_genes());

    let design = metadata.align(genes.sample_ids(), config.drop_unlabeled)?;
    info!(
        "  {} tumor, {} normal samples",
        design.count(SampleGroup::Tumor),
        design.count(SampleGroup::Normal)
    );

    info!(
        "Testing genes ({} t-test)...",
        if config.equal_variance { "Student" } else { "Welch" }
    );
    let results = differential_expression(&genes, &design, config)?;

    Ok(Analysis {
        genes,
        design,
        results,
    })
}

/// Write tables, summary and figures for a finished analysis
pub fn write_outputs(analysis: &Analysis, layout: &DataLayout, config: &AnalysisConfig) -> Result<()> {
    fs::create_dir_all(&layout.results_dir)?;

    let results = &analysis.results;
    write_results(layout.results_csv(), results)?;
    write_significant(layout.significant_csv(), results)?;
    info!("Results written to: {}", layout.results_csv().display());

    let summary = results.summary();
    let writer = BufWriter::new(File::create(layout.summary_json())?);
    serde_json::to_writer_pretty(
        writer,
        &SummaryFile {
            summary: &summary,
            config,
        },
    )?;

    plot::plot_volcano(results, layout.volcano_svg())?;
    info!("Volcano plot written to: {}", layout.volcano_svg().display());

    match plot::heatmap_data(
        &analysis.genes,
        &analysis.design,
        results,
        config.heatmap_max_genes,
    )? {
        Some(data) => {
            plot::plot_heatmap(&data, layout.heatmap_svg())?;
            info!(
                "Heatmap of {} genes written to: {}",
                data.genes.len(),
                layout.heatmap_svg().display()
            );
        }
        None => warn!("No significant genes; heatmap skipped"),
    }
    Ok(())
}

/// Load processed tables, analyze and write every output
pub fn run_analysis<P, Q, R>(
    expression_path: P,
    annotation_path: Q,
    metadata_path: R,
    layout: &DataLayout,
    config: &AnalysisConfig,
) -> Result<ResultsSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    info!("Loading expression matrix from: {}", expression_path.as_ref().display());
    let expression = read_expression_matrix(expression_path)?;
    info!(
        "  {} probes, {} samples",
        expression.n_probes(),
        expression.n_samples()
    );

    info!("Loading annotation from: {}", annotation_path.as_ref().display());
    let annotation = read_annotation(annotation_path)?;

    info!("Loading metadata from: {}", metadata_path.as_ref().display());
    let metadata = read_metadata(metadata_path)?;

    let analysis = analyze(&expression, &annotation, &metadata, config)?;
    write_outputs(&analysis, layout, config)?;
    Ok(analysis.results.summary())
}
