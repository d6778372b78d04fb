//! Command-line interface for crc_degs

use clap::{Args, Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::data::CollapseRule;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "crc_degs")]
#[command(version)]
#[command(about = "Tumor vs normal differential expression for colorectal cancer (GSE103512)")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the GEO series matrix and platform annotation
    #[command(
        long_about = "Download the GEO series matrix (GSE103512) and the platform\n\
            annotation (GPL13158) into <data-dir>/Raw.\n\n\
            Files already present are kept unless --force is given. A failed\n\
            transfer leaves no partial file behind.",
        after_long_help = "\
Examples:
  crc_degs download
  crc_degs download --data-dir /scratch/crc --force"
    )]
    Download {
        /// Data directory [default: Data]
        #[arg(long, default_value = "Data")]
        data_dir: String,

        /// Re-download files that already exist
        #[arg(long)]
        force: bool,

        /// JSON configuration file (source URLs)
        #[arg(long, value_name = "FILE")]
        config: Option<String>,
    },

    /// Convert the raw GEO files into processed CSV tables
    #[command(
        long_about = "Extract the expression table, probe annotation and sample labels\n\
            from the raw GEO files.\n\n\
            Writes raw_counts.csv, probe_to_gene.csv and metadata.csv to\n\
            <data-dir>/Processed.",
        after_long_help = "\
Examples:
  crc_degs prepare
  crc_degs prepare --data-dir /scratch/crc"
    )]
    Prepare {
        /// Data directory [default: Data]
        #[arg(long, default_value = "Data")]
        data_dir: String,
    },

    /// Collapse probes, test Tumor vs Normal and draw the figures
    #[command(
        long_about = "Run the differential expression analysis on processed tables.\n\n\
            Probes are collapsed to one row per gene symbol, each gene is tested\n\
            with a two-sample t-test (Welch by default), p-values are adjusted with\n\
            Benjamini-Hochberg and genes are classified as Upregulated,\n\
            Downregulated or Not Significant. Writes deg_results.csv,\n\
            significant_degs.csv, summary.json, volcano_plot.svg and heatmap.svg.",
        after_long_help = "\
Examples:
  # Processed tables from `crc_degs prepare`
  crc_degs analyze

  # Own tables, stricter thresholds
  crc_degs analyze -e expr.csv -a probe_to_gene.csv -m metadata.csv \\
    --lfc-threshold 2 --padj-threshold 0.01 --results-dir out"
    )]
    Analyze {
        /// Data directory [default: Data]
        #[arg(long, default_value = "Data")]
        data_dir: String,

        /// Results directory [default: Results]
        #[arg(short = 'o', long, default_value = "Results")]
        results_dir: String,

        /// Expression matrix CSV [default: <data-dir>/Processed/raw_counts.csv]
        #[arg(short, long,
            long_help = "Expression matrix CSV or TSV (auto-detected).\n\
                Format: first column = probe IDs, remaining columns = samples.")]
        expression: Option<String>,

        /// Probe annotation CSV [default: <data-dir>/Processed/probe_to_gene.csv]
        #[arg(short, long,
            long_help = "Probe annotation CSV or TSV.\n\
                Format: ProbeID, GeneSymbol, EntrezID.")]
        annotation: Option<String>,

        /// Sample metadata CSV [default: <data-dir>/Processed/metadata.csv]
        #[arg(short, long,
            long_help = "Sample metadata CSV or TSV.\n\
                Format: first column = sample IDs; group column 'SampleType' or 'group'\n\
                (otherwise the second column) with values Tumor / Normal.")]
        metadata: Option<String>,

        #[command(flatten)]
        options: AnalysisArgs,
    },

    /// Download, prepare and analyze in one go
    #[command(after_long_help = "\
Examples:
  crc_degs run
  crc_degs run --threads 8 --heatmap-max-genes 100")]
    Run {
        /// Data directory [default: Data]
        #[arg(long, default_value = "Data")]
        data_dir: String,

        /// Results directory [default: Results]
        #[arg(short = 'o', long, default_value = "Results")]
        results_dir: String,

        /// Re-download files that already exist
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        options: AnalysisArgs,
    },
}

/// Analysis options shared by `analyze` and `run`.
/// Unset flags keep the value from `--config` (or the built-in default).
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// JSON configuration file
    #[arg(long, value_name = "FILE",
        long_help = "JSON configuration file with optional 'analysis' and 'sources'\n\
            sections. Command-line flags override values from the file.")]
    pub config: Option<String>,

    /// Absolute log2 fold change cutoff [default: 1.5]
    #[arg(long)]
    pub lfc_threshold: Option<f64>,

    /// Adjusted p-value cutoff [default: 0.05]
    #[arg(long)]
    pub padj_threshold: Option<f64>,

    /// Pseudocount added to group means before log2 [default: 1e-9]
    #[arg(long)]
    pub pseudocount: Option<f64>,

    /// Use Student's pooled-variance t-test instead of Welch
    #[arg(long)]
    pub equal_variance: bool,

    /// Input values are already log2-scaled
    #[arg(long,
        long_help = "Treat the expression values as already log2-scaled.\n\
            The fold change becomes mean(Tumor) - mean(Normal).")]
    pub log2_input: bool,

    /// Representative probe per gene [default: max-mean]
    #[arg(long, value_name = "RULE",
        long_help = "Rule for picking one probe per gene symbol.\n\
            max-mean:     highest mean intensity (default)\n\
            max-variance: highest variance across samples\n\
            first:        first probe in matrix order")]
    pub collapse_rule: Option<String>,

    /// Show only the N most significant genes in the heatmap
    #[arg(long, value_name = "N")]
    pub heatmap_max_genes: Option<usize>,

    /// Drop samples without a Tumor/Normal label instead of failing
    #[arg(long)]
    pub drop_unlabeled: bool,

    /// Number of threads (0 = auto) [default: 0]
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
}

impl AnalysisArgs {
    /// Configuration file (if any) with the command-line overrides applied
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        let analysis = &mut config.analysis;
        if let Some(v) = self.lfc_threshold {
            analysis.lfc_threshold = v;
        }
        if let Some(v) = self.padj_threshold {
            analysis.padj_threshold = v;
        }
        if let Some(v) = self.pseudocount {
            analysis.pseudocount = v;
        }
        if let Some(rule) = &self.collapse_rule {
            analysis.collapse_rule = rule.parse::<CollapseRule>()?;
        }
        if self.heatmap_max_genes.is_some() {
            analysis.heatmap_max_genes = self.heatmap_max_genes;
        }
        analysis.equal_variance |= self.equal_variance;
        analysis.log2_input |= self.log2_input;
        analysis.drop_unlabeled |= self.drop_unlabeled;

        analysis.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_analyze_overrides() {
        let cli = parse(&[
            "crc_degs",
            "analyze",
            "--lfc-threshold",
            "2",
            "--collapse-rule",
            "max-variance",
            "--equal-variance",
            "-t",
            "4",
        ]);
        let options = match cli.command {
            Some(Commands::Analyze { options, .. }) => options,
            _ => panic!("expected analyze"),
        };
        assert_eq!(options.threads, 4);

        let config = options.resolve().unwrap();
        assert_eq!(config.analysis.lfc_threshold, 2.0);
        assert_eq!(config.analysis.padj_threshold, 0.05);
        assert_eq!(config.analysis.collapse_rule, CollapseRule::MaxVariance);
        assert!(config.analysis.equal_variance);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"analysis": {{"lfc_threshold": 1.0, "padj_threshold": 0.01}}}}"#
        )
        .unwrap();

        let args = AnalysisArgs {
            config: Some(file.path().to_string_lossy().into_owned()),
            padj_threshold: Some(0.1),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.analysis.lfc_threshold, 1.0);
        assert_eq!(config.analysis.padj_threshold, 0.1);
    }

    #[test]
    fn test_unknown_collapse_rule() {
        let args = AnalysisArgs {
            collapse_rule: Some("median".to_string()),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_run_defaults() {
        match parse(&["crc_degs", "run"]).command {
            Some(Commands::Run {
                data_dir,
                results_dir,
                force,
                ..
            }) => {
                assert_eq!(data_dir, "Data");
                assert_eq!(results_dir, "Results");
                assert!(!force);
            }
            _ => panic!("expected run"),
        }
    }
}
