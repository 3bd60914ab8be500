//! Detection adapter: load, crop, preprocess, and hand the image to an engine.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::{OcrError, Result, RosterError};
use crate::models::config::{CropRect, EngineKind, RosterConfig};

use super::{preprocessing::ImagePreprocessor, OcrOutput, TesseractEngine, TextDetector};

/// Runs an OCR engine over the roster region of a screenshot.
pub struct DetectionAdapter {
    detector: Box<dyn TextDetector>,
    preprocessor: ImagePreprocessor,
    enhance: bool,
}

/// Builder for DetectionAdapter.
pub struct DetectionAdapterBuilder {
    detector: Box<dyn TextDetector>,
    crop: CropRect,
    enhance: bool,
    upscale_factor: f32,
}

impl DetectionAdapterBuilder {
    /// Create a new builder around an engine.
    pub fn new(detector: Box<dyn TextDetector>) -> Self {
        Self {
            detector,
            crop: CropRect::default(),
            enhance: false,
            upscale_factor: 1.5,
        }
    }

    /// Set the crop rectangle.
    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = crop;
        self
    }

    /// Enable grayscale/upscale/threshold preprocessing.
    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    /// Set the upscale factor used when enhancing.
    pub fn with_upscale_factor(mut self, factor: f32) -> Self {
        self.upscale_factor = factor;
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<DetectionAdapter> {
        self.crop.validate()?;
        Ok(DetectionAdapter {
            detector: self.detector,
            preprocessor: ImagePreprocessor::new()
                .with_crop(self.crop)
                .with_upscale_factor(self.upscale_factor),
            enhance: self.enhance,
        })
    }
}

impl DetectionAdapter {
    /// Create a new builder.
    pub fn builder(detector: Box<dyn TextDetector>) -> DetectionAdapterBuilder {
        DetectionAdapterBuilder::new(detector)
    }

    /// Build an adapter from configuration, loading the configured engine.
    pub fn from_config(config: &RosterConfig) -> Result<Self> {
        let detector = create_detector(config)?;
        DetectionAdapterBuilder::new(detector)
            .with_crop(config.ocr.crop)
            .with_enhance(config.ocr.enhance)
            .with_upscale_factor(config.ocr.upscale_factor)
            .build()
    }

    /// Name of the underlying engine.
    pub fn engine_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Open an image file and run detection on it.
    pub fn detect_path(&self, path: &Path) -> Result<OcrOutput> {
        if !path.exists() {
            return Err(RosterError::InvalidInput(format!(
                "image not found: {}",
                path.display()
            )));
        }

        let image = image::open(path).map_err(|e| {
            RosterError::InvalidInput(format!("cannot decode {}: {}", path.display(), e))
        })?;

        self.detect_image(&image)
    }

    /// Decode an in-memory image and run detection on it.
    pub fn detect_bytes(&self, data: &[u8]) -> Result<OcrOutput> {
        let image = image::load_from_memory(data)
            .map_err(|e| RosterError::InvalidInput(format!("cannot decode image: {}", e)))?;
        self.detect_image(&image)
    }

    /// Crop, optionally enhance, and run detection on a decoded image.
    pub fn detect_image(&self, image: &DynamicImage) -> Result<OcrOutput> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        info!("Processing image: {}x{}", width, height);

        let cropped = self.preprocessor.crop(image).map_err(|e| match e {
            OcrError::InvalidImage(msg) => RosterError::InvalidInput(msg),
            other => RosterError::Ocr(other),
        })?;

        let prepared = if self.enhance {
            self.preprocessor.enhance(&cropped)?
        } else {
            cropped
        };

        let image_size = prepared.dimensions();
        debug!(
            "Running {} on {}x{} region",
            self.detector.name(),
            image_size.0,
            image_size.1
        );

        let detections = self.detector.detect(&prepared)?;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "OCR complete: {} detections in {}ms",
            detections.len(),
            processing_time_ms
        );

        Ok(OcrOutput {
            detections,
            engine: self.detector.name().to_string(),
            image_size,
            processing_time_ms,
        })
    }
}

/// Load the OCR engine selected by configuration.
///
/// Any failure to find the executable or model files is reported as
/// [`RosterError::EngineUnavailable`].
pub fn create_detector(config: &RosterConfig) -> Result<Box<dyn TextDetector>> {
    match config.ocr.engine {
        EngineKind::Pure => create_pure_detector(config),
        EngineKind::Tesseract => {
            let engine =
                TesseractEngine::new(config.ocr.tesseract_path.as_deref(), &config.ocr.language)
                    .map_err(engine_unavailable)?;
            info!("Using tesseract engine");
            Ok(Box::new(engine))
        }
    }
}

#[cfg(feature = "native")]
fn create_pure_detector(config: &RosterConfig) -> Result<Box<dyn TextDetector>> {
    use super::PureOcrEngine;

    let engine = PureOcrEngine::from_dir(&config.models.model_dir, &config.models)
        .map_err(engine_unavailable)?
        .with_keep_unk(config.ocr.keep_unk);
    Ok(Box::new(engine))
}

#[cfg(not(feature = "native"))]
fn create_pure_detector(_config: &RosterConfig) -> Result<Box<dyn TextDetector>> {
    Err(RosterError::EngineUnavailable(
        "built without the `native` feature; pure-onnx-ocr is not available".to_string(),
    ))
}

fn engine_unavailable(error: OcrError) -> RosterError {
    RosterError::EngineUnavailable(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Detection;
    use image::RgbImage;

    struct FixedDetector;

    impl TextDetector for FixedDetector {
        fn detect(&self, image: &DynamicImage) -> std::result::Result<Vec<Detection>, OcrError> {
            let (w, h) = image.dimensions();
            Ok(vec![Detection::from_rect(0.0, 0.0, w as f32, h as f32, "size", 1.0)])
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_detects_on_cropped_region() {
        let adapter = DetectionAdapter::builder(Box::new(FixedDetector))
            .build()
            .unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 2000));

        let output = adapter.detect_image(&image).unwrap();
        assert_eq!(output.image_size, (370, 1140));
        assert_eq!(output.engine, "fixed");
        assert_eq!(output.detections[0].rect(), (0.0, 0.0, 370.0, 1140.0));
    }

    #[test]
    fn test_missing_file_is_invalid_input() {
        let adapter = DetectionAdapter::builder(Box::new(FixedDetector))
            .build()
            .unwrap();
        let result = adapter.detect_path(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(RosterError::InvalidInput(_))));
    }

    #[test]
    fn test_undecodable_bytes_are_invalid_input() {
        let adapter = DetectionAdapter::builder(Box::new(FixedDetector))
            .build()
            .unwrap();
        let result = adapter.detect_bytes(b"not an image");
        assert!(matches!(result, Err(RosterError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_crop_is_rejected() {
        let crop = CropRect {
            left: 0.5,
            top: 0.0,
            right: 0.5,
            bottom: 1.0,
        };
        let result = DetectionAdapter::builder(Box::new(FixedDetector))
            .with_crop(crop)
            .build();
        assert!(matches!(result, Err(RosterError::Config(_))));
    }

    #[test]
    fn test_missing_models_are_engine_unavailable() {
        let mut config = RosterConfig::default();
        config.models.model_dir = "/nonexistent/models".into();
        config.ocr.tesseract_path = Some("/nonexistent/tesseract".into());

        for engine in [EngineKind::Pure, EngineKind::Tesseract] {
            config.ocr.engine = engine;
            let result = create_detector(&config);
            assert!(matches!(result, Err(RosterError::EngineUnavailable(_))));
        }
    }
}
