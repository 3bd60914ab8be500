//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod engines;
pub mod process;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use roster_core::models::config::{EngineKind, RosterConfig, StrategyKind};

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roster")
        .join("config.json")
}

/// Load the explicit config file, else the user config file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RosterConfig> {
    let config = match config_path {
        Some(path) => RosterConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config file {}", path.display());
                RosterConfig::from_file(&path)?
            } else {
                RosterConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EngineArg {
    /// pure-onnx-ocr with PaddleOCR models
    Pure,
    /// External tesseract executable
    Tesseract,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Pure => EngineKind::Pure,
            EngineArg::Tesseract => EngineKind::Tesseract,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    /// Reading-order state machine
    Sequential,
    /// Line pairing by vertical gap
    Spatial,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => StrategyKind::Sequential,
            StrategyArg::Spatial => StrategyKind::Spatial,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text table
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Whether a path looks like a screenshot the engines can read.
pub fn is_image_path(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tiff" | "tif")
}
