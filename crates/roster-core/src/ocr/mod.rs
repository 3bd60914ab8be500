//! OCR adapter: engines, preprocessing, and the detection types they produce.

mod engine;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod tesseract;

pub use engine::{create_detector, DetectionAdapter, DetectionAdapterBuilder};
pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use tesseract::{find_tesseract_executable, parse_tsv, TesseractEngine};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// One raw OCR hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    ///
    /// Engines that could not report geometry leave non-finite values here;
    /// in JSON those coordinates are written and read as `null`.
    #[serde(with = "nullable_bbox")]
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl Detection {
    /// Build a detection from an axis-aligned rectangle.
    pub fn from_rect(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        text: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            bbox: [left, top, right, top, right, bottom, left, bottom],
            text: text.into(),
            confidence,
        }
    }

    /// Whether every coordinate is a usable number.
    pub fn has_geometry(&self) -> bool {
        self.bbox.iter().all(|v| v.is_finite())
    }

    /// Get the axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

mod nullable_bbox {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bbox: &[f32; 8], serializer: S) -> Result<S::Ok, S::Error> {
        (*bbox).map(|v| v.is_finite().then_some(v)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f32; 8], D::Error> {
        let coords = <[Option<f32>; 8]>::deserialize(deserializer)?;
        Ok(coords.map(|v| v.unwrap_or(f32::NAN)))
    }
}

/// Output of one OCR run over a cropped screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Raw detections in processed-image pixel space.
    pub detections: Vec<Detection>,

    /// Engine that produced the detections.
    pub engine: String,

    /// Size of the image handed to the engine (width, height).
    pub image_size: (u32, u32),

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// An OCR capability returning text detections.
///
/// Tesseract reports one detection per word. The ONNX engine reports one per
/// text-line region, so a detection may hold several words; the token
/// reconstructor re-splits text on whitespace and the spatial strategy
/// regroups detections into rows, so both granularities extract alike.
///
/// Implementations are not assumed to be reentrant; construct one engine per
/// concurrent call site.
pub trait TextDetector {
    /// Detect and recognize words in an image.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError>;

    /// Short engine identifier for logs and output metadata.
    fn name(&self) -> &'static str;
}

impl<T: TextDetector + ?Sized> TextDetector for Box<T> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError> {
        (**self).detect(image)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
