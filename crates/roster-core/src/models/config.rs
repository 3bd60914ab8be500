//! Configuration structures for the roster pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, RosterError};

/// Main configuration for the roster pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Record extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration for the ONNX engine.
    pub models: ModelConfig,
}

/// Which OCR engine produces detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// `pure-onnx-ocr` with PaddleOCR models.
    Pure,
    /// The `tesseract` executable with TSV output.
    Tesseract,
}

/// Which record extraction strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Reading-order token stream with a username/level/class state machine.
    Sequential,
    /// Line grouping with backward username search.
    Spatial,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Sequential => write!(f, "sequential"),
            StrategyKind::Spatial => write!(f, "spatial"),
        }
    }
}

/// Fractional sub-rectangle of the screenshot that holds the roster list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for CropRect {
    fn default() -> Self {
        Self {
            left: 0.14,
            top: 0.18,
            right: 0.51,
            bottom: 0.75,
        }
    }
}

impl CropRect {
    /// The whole image.
    pub fn full() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        }
    }

    /// Check that all fractions lie in `0..=1` and describe a non-empty area.
    pub fn validate(&self) -> Result<()> {
        let fractions = [self.left, self.top, self.right, self.bottom];
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(RosterError::Config(format!(
                "crop fractions must be within 0..=1, got {:?}",
                self
            )));
        }
        if self.left >= self.right || self.top >= self.bottom {
            return Err(RosterError::Config(format!(
                "crop rectangle is empty: {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Pixel rectangle `(x, y, width, height)` for an image of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let x0 = (width as f32 * self.left).round() as u32;
        let y0 = (height as f32 * self.top).round() as u32;
        let x1 = ((width as f32 * self.right).round() as u32).min(width);
        let y1 = ((height as f32 * self.bottom).round() as u32).min(height);
        (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Inclusive range of plausible character levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRange {
    pub min: u32,
    pub max: u32,
}

impl Default for LevelRange {
    fn default() -> Self {
        Self { min: 1, max: 300 }
    }
}

impl LevelRange {
    pub fn contains(&self, level: u32) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine used for text detection.
    pub engine: EngineKind,

    /// Region of the screenshot passed to the engine.
    pub crop: CropRect,

    /// Recognition language hint.
    pub language: String,

    /// Convert to grayscale, upscale and binarize before OCR.
    pub enhance: bool,

    /// Upscale factor used when `enhance` is set.
    pub upscale_factor: f32,

    /// Explicit path to the tesseract executable.
    pub tesseract_path: Option<PathBuf>,

    /// Keep `[UNK]` markers emitted by the ONNX recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Pure,
            crop: CropRect::default(),
            language: "en".to_string(),
            enhance: false,
            upscale_factor: 1.5,
            tesseract_path: None,
            keep_unk: false,
        }
    }
}

/// Record extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Strategy used by default.
    pub strategy: StrategyKind,

    /// Detections below this confidence are discarded (0.0 - 1.0).
    pub min_confidence: f32,

    /// Maximum vertical center distance for words on one line (spatial only).
    pub line_vertical_threshold_px: i32,

    /// Maximum gap between a username line and its level line (spatial only).
    pub username_gap_threshold_px: i32,

    /// Accepted level values.
    pub level_range: LevelRange,

    /// Drop sequential records whose level is outside `level_range`.
    pub validate_level: bool,

    /// Drop sequential records repeating an earlier `(username, level)`.
    pub deduplicate: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Sequential,
            min_confidence: 0.30,
            line_vertical_threshold_px: 20,
            username_gap_threshold_px: 75,
            level_range: LevelRange::default(),
            validate_level: false,
            deduplicate: false,
        }
    }
}

/// Model file locations for the ONNX engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl RosterConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.ocr.crop.validate()?;
        if !(0.0..=1.0).contains(&self.extraction.min_confidence) {
            return Err(RosterError::Config(format!(
                "min_confidence must be within 0..=1, got {}",
                self.extraction.min_confidence
            )));
        }
        if self.extraction.level_range.min > self.extraction.level_range.max {
            return Err(RosterError::Config(format!(
                "level range is empty: {}..={}",
                self.extraction.level_range.min, self.extraction.level_range.max
            )));
        }
        if self.ocr.upscale_factor <= 0.0 {
            return Err(RosterError::Config(format!(
                "upscale_factor must be positive, got {}",
                self.ocr.upscale_factor
            )));
        }
        Ok(())
    }
}
