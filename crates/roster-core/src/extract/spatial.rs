//! Spatial strategy: group tokens into text rows, find level lines, and pair
//! each with the closest unclaimed username row above it.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::models::config::{ExtractionConfig, LevelRange};
use crate::models::player::PlayerRecord;

use super::normalizer::NormalizedToken;
use super::patterns::{CLASS_PREFIX, DATE_LINE, LEVEL_LINE, USERNAME_NOISE};
use super::vocabulary::ClassVocabulary;
use super::{ExtractionOutcome, ExtractionStats, RecordExtractor};

/// Rows containing these markers are UI chrome, never usernames.
const UI_MARKERS: &[&str] = &["Search...", "Allies"];

/// A horizontal row of tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    /// Word texts joined by single spaces, left to right.
    pub text: String,
    pub top: i32,
    pub bottom: i32,
    /// Reference center: the first token's `v_center`.
    pub v_center: f32,
    pub words: Vec<NormalizedToken>,
}

impl Line {
    fn start(token: NormalizedToken) -> Self {
        Self {
            text: String::new(),
            top: token.top,
            bottom: token.bottom,
            v_center: token.v_center,
            words: vec![token],
        }
    }

    fn push(&mut self, token: NormalizedToken) {
        self.top = self.top.min(token.top);
        self.bottom = self.bottom.max(token.bottom);
        self.words.push(token);
    }

    fn finish(mut self) -> Self {
        self.words.sort_by_key(|w| w.left);
        self.text = self
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self
    }

    fn is_date(&self) -> bool {
        DATE_LINE.is_match(&self.text)
    }
}

/// Group tokens into rows.
///
/// Tokens are walked in `(top, left)` order; a token whose `v_center` is at
/// least `threshold` pixels from the current row's reference center opens a
/// new row.
pub fn group_lines(tokens: &[NormalizedToken], threshold: i32) -> Vec<Line> {
    let mut sorted = tokens.to_vec();
    sorted.sort_by_key(|t| (t.top, t.left));

    let mut lines = Vec::new();
    let mut current: Option<Line> = None;

    for token in sorted {
        if let Some(line) = current.as_mut() {
            if (token.v_center - line.v_center).abs() < threshold as f32 {
                line.push(token);
                continue;
            }
        }
        if let Some(done) = current.replace(Line::start(token)) {
            lines.push(done.finish());
        }
    }
    if let Some(done) = current {
        lines.push(done.finish());
    }

    lines
}

/// An emitted record and the rows it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pairing {
    pub record: PlayerRecord,
    /// Index of the username row in the grouped lines.
    pub username_line: usize,
    /// Index of the level row in the grouped lines.
    pub level_line: usize,
}

/// Alternate strategy pairing level rows with username rows by geometry.
///
/// Levels are always range-checked and `(username, level)` repeats are
/// always suppressed.
#[derive(Debug, Clone)]
pub struct SpatialExtractor {
    vocabulary: ClassVocabulary,
    line_threshold: i32,
    gap_threshold: i32,
    level_range: LevelRange,
}

impl SpatialExtractor {
    pub fn new(vocabulary: ClassVocabulary) -> Self {
        Self::from_config(&ExtractionConfig::default(), vocabulary)
    }

    pub fn from_config(config: &ExtractionConfig, vocabulary: ClassVocabulary) -> Self {
        Self {
            vocabulary,
            line_threshold: config.line_vertical_threshold_px,
            gap_threshold: config.username_gap_threshold_px,
            level_range: config.level_range,
        }
    }

    /// Pair level rows with username rows.
    ///
    /// Date rows are ignored entirely. Indices in the returned pairings refer
    /// to `lines`.
    pub fn pair(&self, lines: &[Line]) -> (Vec<Pairing>, ExtractionStats) {
        let mut pairings: Vec<Pairing> = Vec::new();
        let mut stats = ExtractionStats::default();
        let mut claimed: HashSet<usize> = HashSet::new();

        for (i, line) in lines.iter().enumerate() {
            if line.is_date() {
                debug!("Skipping date line {:?}", line.text);
                continue;
            }

            let Some(caps) = LEVEL_LINE.captures(&line.text) else {
                continue;
            };
            let Ok(level) = caps[1].parse::<u32>() else {
                continue;
            };
            if !self.level_range.contains(level) {
                stats.out_of_range += 1;
                debug!("Level {} out of range on line {:?}", level, line.text);
                continue;
            }

            let class_name = self.clean_class(&caps[2]);
            if class_name.is_empty() {
                stats.malformed += 1;
                debug!("No class name on level line {:?}", line.text);
                continue;
            }

            let Some((username_line, username)) = self.find_username(lines, i, &claimed) else {
                stats.ambiguous += 1;
                debug!("No username within {}px above {:?}", self.gap_threshold, line.text);
                continue;
            };

            if pairings
                .iter()
                .any(|p| p.record.key() == (username.as_str(), level))
            {
                stats.duplicates += 1;
                debug!("Duplicate record {} (Lv. {})", username, level);
                continue;
            }

            claimed.insert(username_line);
            pairings.push(Pairing {
                record: PlayerRecord::new(username, level, class_name),
                username_line,
                level_line: i,
            });
        }

        (pairings, stats)
    }

    /// Leading alphabetic run of the remainder, with misreads corrected.
    fn clean_class(&self, remainder: &str) -> String {
        let remainder = remainder.trim();
        let cleaned = match CLASS_PREFIX.captures(remainder) {
            Some(caps) => caps[1].trim().to_string(),
            None => remainder.to_string(),
        };
        self.vocabulary.canonicalize(&cleaned)
    }

    /// Closest unclaimed plausible row above `level_index`.
    fn find_username(
        &self,
        lines: &[Line],
        level_index: usize,
        claimed: &HashSet<usize>,
    ) -> Option<(usize, String)> {
        let level_line = &lines[level_index];

        for j in (0..level_index).rev() {
            if claimed.contains(&j) {
                continue;
            }
            let candidate = &lines[j];
            if candidate.is_date() || !is_plausible_username(&candidate.text) {
                continue;
            }

            let gap = level_line.top - candidate.bottom;
            if gap <= 0 || gap >= self.gap_threshold {
                continue;
            }

            let cleaned = USERNAME_NOISE.replace(&candidate.text, "");
            let cleaned = cleaned.trim();
            if cleaned.chars().count() > 1 {
                return Some((j, cleaned.to_string()));
            }
        }

        None
    }
}

impl Default for SpatialExtractor {
    fn default() -> Self {
        Self::new(ClassVocabulary::default())
    }
}

fn is_plausible_username(text: &str) -> bool {
    !text.to_lowercase().contains("level")
        && text.chars().count() > 1
        && !UI_MARKERS.iter().any(|m| text.contains(m))
}

impl RecordExtractor for SpatialExtractor {
    fn extract(&self, tokens: &[NormalizedToken]) -> ExtractionOutcome {
        let lines = group_lines(tokens, self.line_threshold);
        debug!("Grouped {} tokens into {} lines", tokens.len(), lines.len());

        let (pairings, stats) = self.pair(&lines);
        debug!(
            "Spatial extraction: {} records, {} dropped",
            pairings.len(),
            stats.dropped()
        );

        ExtractionOutcome {
            records: pairings.into_iter().map(|p| p.record).collect(),
            stats,
        }
    }

    fn name(&self) -> &'static str {
        "spatial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tok(left: i32, top: i32, text: &str) -> NormalizedToken {
        NormalizedToken::new(left, top, top + 20, text, 0.9)
    }

    /// A row of words starting at `left`, 80px apart.
    fn row(top: i32, words: &[&str]) -> Vec<NormalizedToken> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| tok(10 + 80 * i as i32, top, w))
            .collect()
    }

    #[test]
    fn test_group_lines_uses_first_word_center() {
        let mut tokens = row(100, &["Level", "42"]);
        tokens.push(tok(200, 112, "Mage"));
        tokens.push(tok(10, 125, "Next"));
        let lines = group_lines(&tokens, 20);

        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Level 42 Mage", "Next"]);
        assert_eq!(lines[0].top, 100);
        assert_eq!(lines[0].bottom, 132);
    }

    #[test]
    fn test_group_lines_threshold_is_exclusive() {
        let near = vec![tok(10, 100, "Level"), tok(90, 119, "42")];
        let lines = group_lines(&near, 20);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Level 42");

        let apart = vec![tok(10, 100, "Level"), tok(90, 120, "42")];
        let lines = group_lines(&apart, 20);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Level", "42"]);
    }

    #[test]
    fn test_gap_threshold() {
        let extractor = SpatialExtractor::default();

        let mut paired = vec![NormalizedToken::new(10, 80, 100, "PlayerOne", 0.9)];
        paired.extend(row(170, &["Level", "42", "Mage"]));
        let outcome = extractor.extract(&paired);
        assert_eq!(outcome.records, vec![PlayerRecord::new("PlayerOne", 42, "Mage")]);

        let mut too_far = vec![NormalizedToken::new(10, 80, 100, "PlayerOne", 0.9)];
        too_far.extend(row(180, &["Level", "42", "Mage"]));
        let outcome = extractor.extract(&too_far);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.ambiguous, 1);
    }

    #[test]
    fn test_username_line_is_not_reused() {
        let mut tokens = row(0, &["Solo"]);
        tokens.extend(row(40, &["Level", "5", "Bard"]));
        tokens.extend(row(80, &["Level", "6", "Monk"]));

        let lines = group_lines(&tokens, 20);
        let (pairings, stats) = SpatialExtractor::default().pair(&lines);
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].username_line, 0);
        assert_eq!(pairings[0].level_line, 1);
        assert_eq!(stats.ambiguous, 1);
    }

    #[test]
    fn test_skips_dates_chrome_and_noise() {
        let mut tokens = row(0, &["Allies"]);
        tokens.extend(row(40, &["+", "=", "Hunter", "Joe"]));
        tokens.extend(row(80, &["31/3/2025"]));
        tokens.extend(row(110, &["Lavel", "120", "Dark", "Knight", "@@"]));

        let outcome = SpatialExtractor::default().extract(&tokens);
        assert_eq!(
            outcome.records,
            vec![PlayerRecord::new("Hunter Joe", 120, "Dark Knight")]
        );
    }

    #[test]
    fn test_out_of_range_level() {
        let mut tokens = row(0, &["Ghost"]);
        tokens.extend(row(40, &["Level", "0", "Mage"]));
        tokens.extend(row(80, &["Level", "301", "Mage"]));

        let outcome = SpatialExtractor::default().extract(&tokens);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.out_of_range, 2);
    }

    #[test]
    fn test_corrects_class_misread() {
        let mut tokens = row(0, &["Blade"]);
        tokens.extend(row(40, &["Level", "77", "snelleward"]));

        let outcome = SpatialExtractor::default().extract(&tokens);
        assert_eq!(outcome.records, vec![PlayerRecord::new("Blade", 77, "Spellsword")]);
    }

    #[test]
    fn test_duplicates_suppressed() {
        let mut tokens = row(0, &["Twin"]);
        tokens.extend(row(40, &["Level", "9", "Mage"]));
        tokens.extend(row(80, &["Twin"]));
        tokens.extend(row(120, &["Level", "9", "Mage"]));

        let outcome = SpatialExtractor::default().extract(&tokens);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.stats.duplicates, 1);
    }

    #[test]
    fn test_empty_input() {
        let outcome = SpatialExtractor::default().extract(&[]);
        assert_eq!(outcome, ExtractionOutcome::default());
    }
}
