//! Error types for the roster-core library.

use thiserror::Error;

/// Main error type for the roster library.
///
/// Only fatal conditions live here. An image that yields no usable text,
/// a partially matched record, or a level line without a username are
/// normal outcomes and surface as empty results or counters in
/// [`ExtractionStats`](crate::extract::ExtractionStats).
#[derive(Error, Debug)]
pub enum RosterError {
    /// Image missing, unreadable, or empty after cropping.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The OCR engine (executable, runtime, or model files) cannot be loaded.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by OCR engines and image preprocessing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models or locate the engine.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection failed.
    #[error("text detection failed: {0}")]
    Detection(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the roster library.
pub type Result<T> = std::result::Result<T, RosterError>;
