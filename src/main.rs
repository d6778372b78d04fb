//! crc_degs command-line interface

use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};

use crc_degs::cli::{AnalysisArgs, Cli, Commands};
use crc_degs::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["download", "prepare", "analyze", "run", "help"];
    let has_subcommand = first_positional
        .map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("crc_degs {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Download {
            data_dir,
            force,
            config,
        }) => run_download(&data_dir, force, config.as_deref()),
        Some(Commands::Prepare { data_dir }) => prepare_data(&DataLayout::new(data_dir, "Results")),
        Some(Commands::Analyze {
            data_dir,
            results_dir,
            expression,
            annotation,
            metadata,
            options,
        }) => run_analyze(
            &data_dir,
            &results_dir,
            expression.as_deref(),
            annotation.as_deref(),
            metadata.as_deref(),
            &options,
        ),
        Some(Commands::Run {
            data_dir,
            results_dir,
            force,
            options,
        }) => run_all(&data_dir, &results_dir, force, &options),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("crc_degs v{}", VERSION);
    println!("Run `crc_degs -h` for usage or `crc_degs --help` for detailed information.");
}

fn print_short_help() {
    println!("crc_degs v{}", VERSION);
    println!();
    println!("Usage: crc_degs <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  download  Download GSE103512 and GPL13158 from GEO");
    println!("  prepare   Build processed tables from the raw GEO files");
    println!("  analyze   Differential expression, tables and figures");
    println!("  run       download + prepare + analyze");
    println!();
    println!("Run `crc_degs <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("crc_degs v{}", VERSION);
    println!("Tumor vs normal differential expression for colorectal cancer (GSE103512)");
    println!();
    println!("Usage: crc_degs <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  download  Download the series matrix and platform annotation into Data/Raw");
    println!("  prepare   Write raw_counts.csv, probe_to_gene.csv and metadata.csv to Data/Processed");
    println!("  analyze   Differential expression analysis");
    println!("              - probe collapsing (max-mean, max-variance, first)");
    println!("              - Welch or Student's t-test, Benjamini-Hochberg adjustment");
    println!("              - volcano plot and clustered heatmap (SVG)");
    println!("  run       download + prepare + analyze");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  crc_degs run");
    println!();
    println!("  crc_degs analyze --lfc-threshold 2 --padj-threshold 0.01 -o Results_strict");
    println!();
    println!("  crc_degs analyze -e expr.csv -a probe_to_gene.csv -m metadata.csv --equal-variance");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn configure_threads(threads: usize) {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }
}

fn run_download(data_dir: &str, force: bool, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    download_all(&DataLayout::new(data_dir, "Results"), &config.sources, force)?;
    info!("Done!");
    Ok(())
}

fn run_analyze(
    data_dir: &str,
    results_dir: &str,
    expression: Option<&str>,
    annotation: Option<&str>,
    metadata: Option<&str>,
    options: &AnalysisArgs,
) -> Result<()> {
    configure_threads(options.threads);
    let config = options.resolve()?;
    let layout = DataLayout::new(data_dir, results_dir);

    let expression = expression.map_or_else(|| layout.expression_csv(), PathBuf::from);
    let annotation = annotation.map_or_else(|| layout.annotation_csv(), PathBuf::from);
    let metadata = metadata.map_or_else(|| layout.metadata_csv(), PathBuf::from);

    let summary = run_analysis(expression, annotation, metadata, &layout, &config.analysis)?;
    println!("\n{}", summary);
    info!("Done!");
    Ok(())
}

fn run_all(data_dir: &str, results_dir: &str, force: bool, options: &AnalysisArgs) -> Result<()> {
    configure_threads(options.threads);
    let config = options.resolve()?;
    let layout = DataLayout::new(data_dir, results_dir);

    download_all(&layout, &config.sources, force)?;
    prepare_data(&layout)?;

    let summary = run_analysis(
        layout.expression_csv(),
        layout.annotation_csv(),
        layout.metadata_csv(),
        &layout,
        &config.analysis,
    )?;
    println!("\n{}", summary);
    info!("Done!");
    Ok(())
}
