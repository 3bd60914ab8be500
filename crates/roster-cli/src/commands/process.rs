//! Process command - extract players from a single screenshot.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use roster_core::models::config::{RosterConfig, StrategyKind};
use roster_core::models::player::PlayerRecord;
use roster_core::ocr::Detection;
use roster_core::{ExtractionResult, RosterPipeline, StrategyComparison};

use super::{is_image_path, load_config, EngineArg, OutputFormat, StrategyArg};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Screenshot, or a JSON file of previously captured detections
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy (default: from config)
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Run both strategies and show where they differ
    #[arg(long)]
    compare: bool,

    /// OCR engine (default: from config)
    #[arg(short, long, value_enum)]
    engine: Option<EngineArg>,

    /// Model directory for the ONNX engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Write the raw OCR detections to this JSON file
    #[arg(long)]
    dump_detections: Option<PathBuf>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(engine) = args.engine {
        config.ocr.engine = engine.into();
    }
    if let Some(ref model_dir) = args.model_dir {
        config.models.model_dir = model_dir.clone();
    }
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let (pipeline, detections) = load_detections(&args.input, &config, &pb)?;

    if let Some(ref dump_path) = args.dump_detections {
        fs::write(dump_path, serde_json::to_string_pretty(&detections)?)?;
        debug!("Wrote {} detections to {}", detections.len(), dump_path.display());
    }

    pb.set_message("Extracting players...");

    let strategy = args
        .strategy
        .map(StrategyKind::from)
        .unwrap_or_else(|| pipeline.default_strategy());

    let output = if args.compare {
        let comparison = pipeline.compare(&detections);
        pb.finish_and_clear();
        format_comparison(&comparison, args.format)?
    } else {
        let result = pipeline.extract_detections(&detections, strategy);
        pb.finish_and_clear();
        print_stats(&result);
        format_records(&result.records, args.format)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Run OCR on a screenshot, or read detections captured by `--dump-detections`.
fn load_detections(
    input: &Path,
    config: &RosterConfig,
    pb: &ProgressBar,
) -> anyhow::Result<(RosterPipeline, Vec<Detection>)> {
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension == "json" {
        pb.set_message("Reading detections...");
        let content = fs::read_to_string(input)?;
        let detections: Vec<Detection> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid detections file {}: {}", input.display(), e))?;
        let pipeline = RosterPipeline::builder()
            .with_extraction(config.extraction.clone())
            .build();
        return Ok((pipeline, detections));
    }

    if !is_image_path(input) {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    pb.set_message("Loading OCR engine...");
    let pipeline = RosterPipeline::from_config(config)?;

    pb.set_message("Running OCR...");
    let output = pipeline.detect_path(input)?;
    debug!(
        "{} detected {} words in {}ms",
        output.engine,
        output.detections.len(),
        output.processing_time_ms
    );

    Ok((pipeline, output.detections))
}

fn print_stats(result: &ExtractionResult) {
    if result.stats.dropped() > 0 {
        eprintln!(
            "{} {} candidates dropped ({} malformed, {} ambiguous, {} duplicate, {} out of range)",
            style("ℹ").blue(),
            result.stats.dropped(),
            result.stats.malformed,
            result.stats.ambiguous,
            result.stats.duplicates,
            result.stats.out_of_range
        );
    }
    if result.records.is_empty() {
        eprintln!("{} No players found", style("⚠").yellow());
    }
}

pub(crate) fn format_records(records: &[PlayerRecord], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => format_csv(records),
        OutputFormat::Text => Ok(format_text(records)),
    }
}

fn format_csv(records: &[PlayerRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["username", "level", "class"])?;
    for record in records {
        let level = record.level.to_string();
        wtr.write_record([
            record.username.as_str(),
            level.as_str(),
            record.class_name.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(records: &[PlayerRecord]) -> String {
    let width = records
        .iter()
        .map(|r| r.username.chars().count())
        .max()
        .unwrap_or(0)
        .max("Username".len());

    let mut output = String::new();
    output.push_str(&format!("{:<width$}  {:>5}  {}\n", "Username", "Level", "Class"));
    for record in records {
        output.push_str(&format!(
            "{:<width$}  {:>5}  {}\n",
            record.username, record.level, record.class_name
        ));
    }
    output.push_str(&format!("\n{} players\n", records.len()));

    output
}

fn format_comparison(comparison: &StrategyComparison, format: OutputFormat) -> anyhow::Result<String> {
    let groups = [
        ("both", comparison.agreed()),
        ("sequential", comparison.sequential_only()),
        ("spatial", comparison.spatial_only()),
    ];

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(comparison)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record(["found_by", "username", "level", "class"])?;
            for (source, records) in &groups {
                for record in records {
                    let level = record.level.to_string();
                    wtr.write_record([
                        *source,
                        record.username.as_str(),
                        level.as_str(),
                        record.class_name.as_str(),
                    ])?;
                }
            }
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for (source, records) in &groups {
                output.push_str(&format!("Found by {} ({}):\n", source, records.len()));
                for record in records {
                    output.push_str(&format!("  {}\n", record));
                }
                output.push('\n');
            }
            Ok(output)
        }
    }
}
