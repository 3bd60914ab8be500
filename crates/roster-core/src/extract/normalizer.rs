//! Turn raw detections into clean, reading-ordered tokens.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ocr::Detection;

/// A detection after cleanup, in integer pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedToken {
    pub left: i32,
    pub top: i32,
    pub bottom: i32,
    /// `top + (bottom - top) / 2`.
    pub v_center: f32,
    /// Trimmed, never empty.
    pub text: String,
    pub confidence: f32,
}

impl NormalizedToken {
    pub fn new(left: i32, top: i32, bottom: i32, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            left,
            top,
            bottom,
            v_center: top as f32 + (bottom - top) as f32 / 2.0,
            text: text.into(),
            confidence,
        }
    }
}

/// Filters and orders detections.
#[derive(Debug, Clone)]
pub struct DetectionNormalizer {
    min_confidence: f32,
}

impl DetectionNormalizer {
    pub fn new() -> Self {
        Self {
            min_confidence: 0.30,
        }
    }

    /// Set minimum confidence threshold.
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = confidence;
        self
    }

    /// Normalize detections.
    ///
    /// Drops detections without usable geometry, below the confidence
    /// threshold, or with blank text, then sorts by `(top, left)`. An empty
    /// result is a normal outcome.
    pub fn normalize(&self, detections: &[Detection]) -> Vec<NormalizedToken> {
        let mut no_geometry = 0usize;
        let mut low_confidence = 0usize;
        let mut blank = 0usize;

        let mut tokens: Vec<NormalizedToken> = detections
            .iter()
            .filter_map(|det| {
                if !det.has_geometry() {
                    no_geometry += 1;
                    return None;
                }
                let (min_x, min_y, _, max_y) = det.rect();

                if det.confidence.is_nan() || det.confidence < self.min_confidence {
                    low_confidence += 1;
                    return None;
                }

                let text = det.text.trim();
                if text.is_empty() {
                    blank += 1;
                    return None;
                }

                Some(NormalizedToken::new(
                    min_x.round() as i32,
                    min_y.round() as i32,
                    max_y.round() as i32,
                    text,
                    det.confidence,
                ))
            })
            .collect();

        tokens.sort_by_key(|t| (t.top, t.left));

        debug!(
            "Normalized {} detections into {} tokens (dropped: {} no geometry, {} low confidence, {} blank)",
            detections.len(),
            tokens.len(),
            no_geometry,
            low_confidence,
            blank
        );

        tokens
    }
}

impl Default for DetectionNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
