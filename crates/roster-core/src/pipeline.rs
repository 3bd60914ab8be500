//! End-to-end pipeline: image -> detections -> tokens -> player records.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, RosterError};
use crate::extract::{
    create_extractor, ClassVocabulary, DetectionNormalizer, ExtractionOutcome, ExtractionStats,
    NormalizedToken,
};
use crate::models::config::{ExtractionConfig, RosterConfig, StrategyKind};
use crate::models::player::PlayerRecord;
use crate::ocr::{Detection, DetectionAdapter, OcrOutput};

/// Result of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Records in emission order.
    pub records: Vec<PlayerRecord>,
    /// Strategy that produced the records.
    pub strategy: StrategyKind,
    /// Engine that produced the detections, if OCR ran.
    pub engine: Option<String>,
    /// Dropped candidate counters.
    pub stats: ExtractionStats,
    /// Raw detections handed to the normalizer.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detections: Vec<Detection>,
    /// Tokens surviving normalization.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<NormalizedToken>,
    /// OCR plus extraction time in milliseconds.
    pub processing_time_ms: u64,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Both strategies run over the same tokens.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyComparison {
    pub sequential: ExtractionOutcome,
    pub spatial: ExtractionOutcome,
}

impl StrategyComparison {
    /// Records emitted by both strategies.
    pub fn agreed(&self) -> Vec<&PlayerRecord> {
        self.sequential
            .records
            .iter()
            .filter(|r| self.spatial.records.contains(r))
            .collect()
    }

    /// Records emitted by the sequential strategy only.
    pub fn sequential_only(&self) -> Vec<&PlayerRecord> {
        self.sequential
            .records
            .iter()
            .filter(|r| !self.spatial.records.contains(r))
            .collect()
    }

    /// Records emitted by the spatial strategy only.
    pub fn spatial_only(&self) -> Vec<&PlayerRecord> {
        self.spatial
            .records
            .iter()
            .filter(|r| !self.sequential.records.contains(r))
            .collect()
    }
}

/// Roster extraction pipeline.
///
/// Each call is independent: nothing is cached between images. The OCR
/// engine is owned by the pipeline, so concurrent callers need one pipeline
/// each.
pub struct RosterPipeline {
    adapter: Option<DetectionAdapter>,
    normalizer: DetectionNormalizer,
    vocabulary: ClassVocabulary,
    extraction: ExtractionConfig,
}

/// Builder for RosterPipeline.
pub struct RosterPipelineBuilder {
    adapter: Option<DetectionAdapter>,
    vocabulary: ClassVocabulary,
    extraction: ExtractionConfig,
}

impl RosterPipelineBuilder {
    pub fn new() -> Self {
        Self {
            adapter: None,
            vocabulary: ClassVocabulary::default(),
            extraction: ExtractionConfig::default(),
        }
    }

    /// Attach an OCR adapter. Without one only `extract_detections` works.
    pub fn with_adapter(mut self, adapter: DetectionAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: ClassVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn build(self) -> RosterPipeline {
        RosterPipeline {
            adapter: self.adapter,
            normalizer: DetectionNormalizer::new()
                .with_min_confidence(self.extraction.min_confidence),
            vocabulary: self.vocabulary,
            extraction: self.extraction,
        }
    }
}

impl Default for RosterPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterPipeline {
    pub fn builder() -> RosterPipelineBuilder {
        RosterPipelineBuilder::new()
    }

    /// Validate configuration and load the configured OCR engine.
    pub fn from_config(config: &RosterConfig) -> Result<Self> {
        config.validate()?;
        let adapter = DetectionAdapter::from_config(config)?;
        Ok(RosterPipelineBuilder::new()
            .with_adapter(adapter)
            .with_extraction(config.extraction.clone())
            .build())
    }

    /// Strategy used when the caller does not pick one.
    pub fn default_strategy(&self) -> StrategyKind {
        self.extraction.strategy
    }

    /// Name of the attached OCR engine.
    pub fn engine_name(&self) -> Option<&'static str> {
        self.adapter.as_ref().map(|a| a.engine_name())
    }

    fn adapter(&self) -> Result<&DetectionAdapter> {
        self.adapter.as_ref().ok_or_else(|| {
            RosterError::EngineUnavailable("no OCR engine attached to the pipeline".to_string())
        })
    }

    /// Run OCR on an image file.
    pub fn detect_path(&self, path: &Path) -> Result<OcrOutput> {
        self.adapter()?.detect_path(path)
    }

    /// Extract records from an image file.
    pub fn extract_path(&self, path: &Path, strategy: StrategyKind) -> Result<ExtractionResult> {
        info!("Extracting roster from {}", path.display());
        let output = self.detect_path(path)?;
        Ok(self.finish(output, strategy))
    }

    /// Extract records from a decoded image.
    pub fn extract_image(
        &self,
        image: &DynamicImage,
        strategy: StrategyKind,
    ) -> Result<ExtractionResult> {
        let output = self.adapter()?.detect_image(image)?;
        Ok(self.finish(output, strategy))
    }

    /// Extract records from encoded image bytes.
    pub fn extract_bytes(&self, data: &[u8], strategy: StrategyKind) -> Result<ExtractionResult> {
        let output = self.adapter()?.detect_bytes(data)?;
        Ok(self.finish(output, strategy))
    }

    fn finish(&self, output: OcrOutput, strategy: StrategyKind) -> ExtractionResult {
        let mut result = self.extract_detections(&output.detections, strategy);
        result.detections = output.detections;
        result.engine = Some(output.engine);
        result.processing_time_ms += output.processing_time_ms;
        result
    }

    /// Extract records from detections produced elsewhere.
    ///
    /// Never fails: no usable tokens simply means no records.
    pub fn extract_detections(
        &self,
        detections: &[Detection],
        strategy: StrategyKind,
    ) -> ExtractionResult {
        let start = Instant::now();

        let tokens = self.normalizer.normalize(detections);
        if tokens.is_empty() {
            debug!("No usable tokens in {} detections", detections.len());
        }

        let extractor = create_extractor(strategy, &self.extraction, self.vocabulary.clone());
        let outcome = extractor.extract(&tokens);

        info!(
            "{} strategy: {} records from {} tokens ({} dropped)",
            extractor.name(),
            outcome.records.len(),
            tokens.len(),
            outcome.stats.dropped()
        );

        ExtractionResult {
            records: outcome.records,
            strategy,
            engine: None,
            stats: outcome.stats,
            detections: Vec::new(),
            tokens,
            processing_time_ms: start.elapsed().as_millis() as u64,
            extracted_at: Utc::now(),
        }
    }

    /// Run both strategies over the same detections.
    pub fn compare(&self, detections: &[Detection]) -> StrategyComparison {
        let tokens = self.normalizer.normalize(detections);
        let run = |kind| {
            create_extractor(kind, &self.extraction, self.vocabulary.clone()).extract(&tokens)
        };

        StrategyComparison {
            sequential: run(StrategyKind::Sequential),
            spatial: run(StrategyKind::Spatial),
        }
    }
}
