//! Player record extraction from normalized OCR tokens.

mod assembler;
mod normalizer;
pub mod patterns;
mod spatial;
mod tokens;
mod vocabulary;

pub use assembler::{AssemblerState, RecordAssembler, SequentialExtractor};
pub use normalizer::{DetectionNormalizer, NormalizedToken};
pub use spatial::{group_lines, Line, Pairing, SpatialExtractor};
pub use tokens::TokenReconstructor;
pub use vocabulary::ClassVocabulary;

use serde::{Deserialize, Serialize};

use crate::models::config::{ExtractionConfig, StrategyKind};
use crate::models::player::PlayerRecord;

/// Counters for input that was recovered from rather than emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Partial username/level/class triples that were discarded.
    pub malformed: usize,
    /// Level lines with no plausible username above them.
    pub ambiguous: usize,
    /// Records suppressed because `(username, level)` was already emitted.
    pub duplicates: usize,
    /// Records or level lines outside the accepted level range.
    pub out_of_range: usize,
}

impl ExtractionStats {
    /// Total number of discarded candidates.
    pub fn dropped(&self) -> usize {
        self.malformed + self.ambiguous + self.duplicates + self.out_of_range
    }
}

/// Records produced by one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub records: Vec<PlayerRecord>,
    pub stats: ExtractionStats,
}

/// A strategy turning normalized tokens into player records.
pub trait RecordExtractor {
    /// Extract records from tokens sorted in reading order.
    fn extract(&self, tokens: &[NormalizedToken]) -> ExtractionOutcome;

    /// Strategy identifier.
    fn name(&self) -> &'static str;
}

/// Build the extractor selected by `kind`.
pub fn create_extractor(
    kind: StrategyKind,
    config: &ExtractionConfig,
    vocabulary: ClassVocabulary,
) -> Box<dyn RecordExtractor> {
    match kind {
        StrategyKind::Sequential => Box::new(SequentialExtractor::from_config(config, vocabulary)),
        StrategyKind::Spatial => Box::new(SpatialExtractor::from_config(config, vocabulary)),
    }
}
