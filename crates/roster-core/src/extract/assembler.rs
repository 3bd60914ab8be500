//! Sequential strategy: a username -> level -> class state machine over the
//! reading-order token stream.

use std::collections::HashSet;

use tracing::debug;

use crate::models::config::{ExtractionConfig, LevelRange};
use crate::models::player::PlayerRecord;

use super::normalizer::NormalizedToken;
use super::tokens::TokenReconstructor;
use super::vocabulary::ClassVocabulary;
use super::{ExtractionOutcome, ExtractionStats, RecordExtractor};

/// Which field the next token feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Username,
    Level,
    Class,
}

#[derive(Debug, Default)]
struct Accumulator {
    username: String,
    level: u32,
    class_name: String,
}

/// Single-pass record assembler.
#[derive(Debug)]
pub struct RecordAssembler {
    state: AssemblerState,
    current: Accumulator,
    records: Vec<PlayerRecord>,
    stats: ExtractionStats,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Username,
            current: Accumulator::default(),
            records: Vec::new(),
            stats: ExtractionStats::default(),
        }
    }

    /// Run the machine over a whole token stream.
    pub fn assemble<S: AsRef<str>>(tokens: &[S]) -> ExtractionOutcome {
        let mut assembler = Self::new();
        for (i, token) in tokens.iter().enumerate() {
            let next = tokens.get(i + 1).map(|t| t.as_ref());
            assembler.step(token.as_ref(), next);
        }
        assembler.finish()
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Records emitted so far.
    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    /// Consume one token. `next` is the following token, if any.
    pub fn step(&mut self, token: &str, next: Option<&str>) {
        match self.state {
            AssemblerState::Username => {
                if token.to_lowercase().starts_with("level") {
                    self.state = if next.is_some_and(is_numeric) {
                        AssemblerState::Level
                    } else {
                        AssemblerState::Class
                    };
                } else {
                    self.current.username.push(' ');
                    self.current.username.push_str(token);
                }
            }
            AssemblerState::Level => {
                if is_numeric(token) {
                    match token.parse::<u32>() {
                        Ok(level) => self.current.level = level,
                        Err(e) => debug!("Unparseable level {:?}: {}", token, e),
                    }
                }
                self.state = AssemblerState::Class;
            }
            AssemblerState::Class => {
                self.current.class_name.push_str(token);
                self.emit();
                self.state = AssemblerState::Username;
            }
        }
    }

    fn emit(&mut self) {
        let candidate = std::mem::take(&mut self.current);
        let username = candidate.username.trim();

        if username.is_empty() || candidate.class_name.is_empty() {
            self.stats.malformed += 1;
            debug!(
                "Dropping malformed record: username={:?} level={} class={:?}",
                username, candidate.level, candidate.class_name
            );
            return;
        }

        self.records.push(PlayerRecord::new(
            username,
            candidate.level,
            candidate.class_name,
        ));
    }

    /// Finish the run. A username still waiting for its level marker is dropped.
    pub fn finish(self) -> ExtractionOutcome {
        if !self.current.username.trim().is_empty() {
            debug!(
                "Discarding trailing username {:?} without level/class",
                self.current.username.trim()
            );
        }
        ExtractionOutcome {
            records: self.records,
            stats: self.stats,
        }
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Primary strategy: token reconstruction followed by the record assembler.
///
/// By default levels are not range-checked and duplicates are kept; both
/// checks can be switched on through [`ExtractionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SequentialExtractor {
    reconstructor: TokenReconstructor,
    level_range: Option<LevelRange>,
    deduplicate: bool,
}

impl SequentialExtractor {
    pub fn new(vocabulary: ClassVocabulary) -> Self {
        Self {
            reconstructor: TokenReconstructor::new(vocabulary),
            level_range: None,
            deduplicate: false,
        }
    }

    pub fn from_config(config: &ExtractionConfig, vocabulary: ClassVocabulary) -> Self {
        Self::new(vocabulary)
            .with_level_validation(config.validate_level.then_some(config.level_range))
            .with_deduplication(config.deduplicate)
    }

    /// Drop records whose level falls outside `range`.
    pub fn with_level_validation(mut self, range: Option<LevelRange>) -> Self {
        self.level_range = range;
        self
    }

    /// Drop records repeating an earlier `(username, level)`.
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    /// Run on a raw word stream, merging class names first.
    pub fn extract_words<S: AsRef<str>>(&self, words: &[S]) -> ExtractionOutcome {
        let stream = self.reconstructor.merge_words(words);
        self.apply_filters(RecordAssembler::assemble(&stream))
    }

    fn apply_filters(&self, mut outcome: ExtractionOutcome) -> ExtractionOutcome {
        if let Some(range) = self.level_range {
            let before = outcome.records.len();
            outcome.records.retain(|r| range.contains(r.level));
            outcome.stats.out_of_range += before - outcome.records.len();
        }

        if self.deduplicate {
            let mut seen = HashSet::new();
            let before = outcome.records.len();
            outcome.records.retain(|r| {
                let (username, level) = r.key();
                seen.insert((username.to_owned(), level))
            });
            outcome.stats.duplicates += before - outcome.records.len();
        }

        outcome
    }
}

impl RecordExtractor for SequentialExtractor {
    fn extract(&self, tokens: &[NormalizedToken]) -> ExtractionOutcome {
        let stream = self.reconstructor.reconstruct(tokens);
        debug!("Reconstructed {} stream tokens", stream.len());

        let outcome = self.apply_filters(RecordAssembler::assemble(&stream));
        debug!(
            "Sequential extraction: {} records, {} dropped",
            outcome.records.len(),
            outcome.stats.dropped()
        );
        outcome
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hydron_vocab() -> ClassVocabulary {
        ClassVocabulary::new(["Mage", "Bard", "Summoner", "Grand Summoner Hydron"])
    }

    #[test]
    fn test_single_record_with_merged_class() {
        let extractor = SequentialExtractor::new(hydron_vocab());
        let outcome =
            extractor.extract_words(&["PlayerOne", "Level", "42", "Grand", "Summoner", "Hydron"]);
        assert_eq!(
            outcome.records,
            vec![PlayerRecord::new("PlayerOne", 42, "Grand Summoner Hydron")]
        );
        assert_eq!(outcome.stats, ExtractionStats::default());
    }

    #[test]
    fn test_missing_username_is_dropped_and_state_resets() {
        let mut assembler = RecordAssembler::new();
        let tokens = ["Level", "10", "Mage"];
        for (i, token) in tokens.iter().enumerate() {
            assembler.step(token, tokens.get(i + 1).copied());
        }
        assert_eq!(assembler.state(), AssemblerState::Username);
        assert!(assembler.records().is_empty());

        let outcome = RecordAssembler::assemble(&[
            "Level", "10", "Mage", "PlayerTwo", "Level", "5", "Bard",
        ]);
        assert_eq!(outcome.records, vec![PlayerRecord::new("PlayerTwo", 5, "Bard")]);
        assert_eq!(outcome.stats.malformed, 1);
    }

    #[test]
    fn test_transitions() {
        let mut assembler = RecordAssembler::new();
        assembler.step("Some", Some("Body"));
        assert_eq!(assembler.state(), AssemblerState::Username);
        assembler.step("Body", Some("LEVEL"));
        assembler.step("LEVEL", Some("7"));
        assert_eq!(assembler.state(), AssemblerState::Level);
        assembler.step("7", Some("Monk"));
        assert_eq!(assembler.state(), AssemblerState::Class);
        assembler.step("Monk", None);
        assert_eq!(assembler.state(), AssemblerState::Username);
        assert_eq!(assembler.records(), &[PlayerRecord::new("Some Body", 7, "Monk")]);
    }

    #[test]
    fn test_malformed_level_marker_goes_to_class() {
        let outcome = RecordAssembler::assemble(&["Hero", "Level:", "Mage", "Next"]);
        assert_eq!(outcome.records, vec![PlayerRecord::new("Hero", 0, "Mage")]);
    }

    #[test]
    fn test_numeric_username_words_and_trailing_username() {
        let outcome =
            RecordAssembler::assemble(&["Agent", "47", "Level", "3", "Thief", "Dangling", "Name"]);
        assert_eq!(outcome.records, vec![PlayerRecord::new("Agent 47", 3, "Thief")]);
        assert_eq!(outcome.stats.malformed, 0);
    }

    #[test]
    fn test_overflowing_level_stays_zero() {
        let outcome = RecordAssembler::assemble(&["Big", "Level", "99999999999", "Bard"]);
        assert_eq!(outcome.records, vec![PlayerRecord::new("Big", 0, "Bard")]);
    }

    #[test]
    fn test_optional_filters() {
        let words = [
            "Dup", "Level", "5", "Mage", "Dup", "Level", "5", "Mage", "Huge", "Level", "999",
            "Bard",
        ];

        let loose = SequentialExtractor::new(hydron_vocab()).extract_words(&words);
        assert_eq!(loose.records.len(), 3);

        let strict = SequentialExtractor::new(hydron_vocab())
            .with_level_validation(Some(LevelRange::default()))
            .with_deduplication(true)
            .extract_words(&words);
        assert_eq!(strict.records, vec![PlayerRecord::new("Dup", 5, "Mage")]);
        assert_eq!(strict.stats.duplicates, 1);
        assert_eq!(strict.stats.out_of_range, 1);
    }

    #[test]
    fn test_extract_from_tokens_is_deterministic() {
        let tokens = vec![
            NormalizedToken::new(10, 10, 30, "PlayerOne", 0.9),
            NormalizedToken::new(10, 40, 60, "Level", 0.9),
            NormalizedToken::new(70, 40, 60, "42", 0.9),
            NormalizedToken::new(100, 40, 60, "Grand Summoner Hydron", 0.9),
        ];
        let extractor = SequentialExtractor::new(hydron_vocab());
        let first = extractor.extract(&tokens);
        assert_eq!(first, extractor.extract(&tokens));
        assert_eq!(first.records.len(), 1);
    }

    #[test]
    fn test_empty_tokens() {
        let outcome = SequentialExtractor::default().extract(&[]);
        assert!(outcome.records.is_empty());
    }
}
