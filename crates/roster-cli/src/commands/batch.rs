//! Batch processing command for many roster screenshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use roster_core::models::config::StrategyKind;
use roster_core::{ExtractionResult, RosterPipeline};

use super::process::format_records;
use super::{is_image_path, load_config, EngineArg, OutputFormat, StrategyArg};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern (e.g. "screens/*.png")
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy (default: from config)
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// OCR engine (default: from config)
    #[arg(short, long, value_enum)]
    engine: Option<EngineArg>,

    /// Model directory for the ONNX engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(engine) = args.engine {
        config.ocr.engine = engine.into();
    }
    if let Some(ref model_dir) = args.model_dir {
        config.models.model_dir = model_dir.clone();
    }
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image_path(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One engine for the whole run; files are processed in order.
    let pipeline = RosterPipeline::from_config(&config)?;
    let strategy = args
        .strategy
        .map(StrategyKind::from)
        .unwrap_or_else(|| pipeline.default_strategy());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = pipeline.extract_path(&path, strategy);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                debug!("{}: {} players", path.display(), result.records.len());
                results.push(FileResult {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    if let Some(ref output_dir) = args.output_dir {
        for file in &results {
            if let Some(ref result) = file.result {
                write_output(output_dir, &file.path, result, args.format)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();
    let players: usize = results
        .iter()
        .filter_map(|r| r.result.as_ref())
        .map(|r| r.records.len())
        .sum();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} players",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red(),
        style(players).cyan()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for file in &failed {
            println!(
                "  - {}: {}",
                file.path.display(),
                file.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_output(
    output_dir: &Path,
    source: &Path,
    result: &ExtractionResult,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("roster");
    let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));

    fs::write(&output_path, format_records(&result.records, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "strategy",
        "players",
        "malformed",
        "ambiguous",
        "duplicates",
        "out_of_range",
        "processing_time_ms",
        "extracted_at",
        "error",
    ])?;

    for file in results {
        let filename = file
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = file.processing_time_ms.to_string();

        match &file.result {
            Some(result) => {
                let stats = result.stats;
                wtr.write_record([
                    filename.to_string(),
                    "success".to_string(),
                    result.strategy.to_string(),
                    result.records.len().to_string(),
                    stats.malformed.to_string(),
                    stats.ambiguous.to_string(),
                    stats.duplicates.to_string(),
                    stats.out_of_range.to_string(),
                    time,
                    result.extracted_at.to_rfc3339(),
                    String::new(),
                ])?;
            }
            None => {
                wtr.write_record([
                    filename.to_string(),
                    "error".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    time,
                    String::new(),
                    file.error.clone().unwrap_or_default(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
