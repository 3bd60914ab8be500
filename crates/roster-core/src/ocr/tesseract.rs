//! Tesseract engine driven through its command-line TSV output.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::OcrError;

use super::{Detection, TextDetector};

/// TSV row level for individual words.
const TSV_WORD_LEVEL: u32 = 5;
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text.
const TSV_MIN_FIELDS: usize = 12;

/// OCR engine that shells out to the `tesseract` executable.
pub struct TesseractEngine {
    executable: PathBuf,
    language: String,
}

impl TesseractEngine {
    /// Locate the executable (explicit path first, then `PATH`).
    pub fn new(explicit: Option<&Path>, language: &str) -> Result<Self, OcrError> {
        let executable = find_tesseract_executable(explicit)?;
        Ok(Self {
            executable,
            language: tesseract_language(language).to_string(),
        })
    }
}

impl TextDetector for TesseractEngine {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError> {
        let input = NamedTempFile::with_suffix(".png")
            .map_err(|e| OcrError::Detection(format!("failed to create temp file: {}", e)))?;
        image
            .save(input.path())
            .map_err(|e| OcrError::Preprocessing(format!("failed to write temp image: {}", e)))?;

        // Sparse text, LSTM only, no dictionaries: usernames are not words.
        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", self.language.as_str()])
            .args(["--oem", "1", "--psm", "11"])
            .args(["-c", "load_system_dawg=0", "-c", "load_freq_dawg=0"])
            .arg("tsv")
            .output()
            .map_err(|e| OcrError::ModelLoad(format!("failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Detection(format!("tesseract failed: {}", stderr.trim())));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let detections = parse_tsv(&tsv);
        debug!("tesseract returned {} words", detections.len());
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Parse Tesseract TSV into word detections.
///
/// Confidence is rescaled from 0-100 to 0.0-1.0. Geometry columns that do
/// not parse are kept as NaN so that the normalizer can drop the row.
pub fn parse_tsv(tsv: &str) -> Vec<Detection> {
    let mut detections = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }

        let level: u32 = fields[0].trim().parse().unwrap_or(0);
        if level != TSV_WORD_LEVEL {
            continue;
        }

        let coord = |i: usize| fields[i].trim().parse::<f32>().unwrap_or(f32::NAN);
        let left = coord(6);
        let top = coord(7);
        let width = coord(8);
        let height = coord(9);
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);

        detections.push(Detection::from_rect(
            left,
            top,
            left + width,
            top + height,
            fields[11],
            conf / 100.0,
        ));
    }

    detections
}

/// Find the tesseract executable.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf, OcrError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(OcrError::ModelLoad(format!(
            "tesseract not found at {}",
            path.display()
        )));
    }

    match Command::new("tesseract").arg("--version").output() {
        Ok(output) if output.status.success() => Ok(PathBuf::from("tesseract")),
        _ => Err(OcrError::ModelLoad(
            "tesseract is not installed or not in PATH".to_string(),
        )),
    }
}

fn tesseract_language(language: &str) -> &str {
    match language {
        "en" => "eng",
        other => other,
    }
}
