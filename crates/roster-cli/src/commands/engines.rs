//! Engines command - report which OCR engines can run.

use std::fs;

use clap::{Args, Subcommand};
use console::style;

use roster_core::models::config::{EngineKind, RosterConfig};
use roster_core::ocr::find_tesseract_executable;

use super::load_config;

/// Arguments for the engines command.
#[derive(Args)]
pub struct EnginesArgs {
    #[command(subcommand)]
    command: EnginesCommand,
}

#[derive(Subcommand)]
enum EnginesCommand {
    /// Check model files and the tesseract executable
    Status,
}

pub async fn run(args: EnginesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    match args.command {
        EnginesCommand::Status => check_status(&config),
    }
}

fn check_status(config: &RosterConfig) -> anyhow::Result<()> {
    let selected = config.ocr.engine;

    println!("{}", style("Engine Status").bold());
    println!();

    let marker = |engine: EngineKind| {
        if engine == selected {
            style(" ◀ selected").green().to_string()
        } else {
            String::new()
        }
    };

    println!(
        "{} {}{}",
        style("▸ pure").bold(),
        config.models.model_dir.display(),
        marker(EngineKind::Pure)
    );

    let mut all_present = true;
    for name in [
        &config.models.detection_model,
        &config.models.recognition_model,
        &config.models.dictionary,
    ] {
        let path = config.model_path(name);
        if path.exists() {
            let size = fs::metadata(&path)?.len();
            println!("  {} {} ({})", style("✓").green(), name, format_size(size));
        } else {
            all_present = false;
            println!("  {} {} (missing)", style("✗").red(), name);
        }
    }
    if !all_present {
        println!(
            "  Place PaddleOCR models in {} or pass --model-dir.",
            config.models.model_dir.display()
        );
    }
    println!();

    println!("{}{}", style("▸ tesseract").bold(), marker(EngineKind::Tesseract));
    match find_tesseract_executable(config.ocr.tesseract_path.as_deref()) {
        Ok(path) => println!("  {} {}", style("✓").green(), path.display()),
        Err(e) => println!("  {} {}", style("✗").red(), e),
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
