//! Core library for roster screenshot OCR.
//!
//! This crate provides:
//! - An OCR adapter over pluggable engines (pure-onnx-ocr, tesseract)
//! - Detection normalization into reading-ordered tokens
//! - Class-name token reconstruction against a known vocabulary
//! - Two player record extraction strategies (sequential state machine and
//!   spatial line pairing)

pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pipeline;

pub use error::{OcrError, Result, RosterError};
pub use extract::{
    create_extractor, ClassVocabulary, DetectionNormalizer, ExtractionOutcome, ExtractionStats,
    NormalizedToken, RecordExtractor, SequentialExtractor, SpatialExtractor, TokenReconstructor,
};
pub use models::config::{EngineKind, RosterConfig, StrategyKind};
pub use models::player::PlayerRecord;
pub use ocr::{create_detector, Detection, DetectionAdapter, OcrOutput, TextDetector};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use ocr::TesseractEngine;
pub use pipeline::{ExtractionResult, RosterPipeline, StrategyComparison};
