//! Flatten normalized detections into a word stream with fused class names.

use super::normalizer::NormalizedToken;
use super::vocabulary::ClassVocabulary;

/// Builds the token stream consumed by the record assembler.
#[derive(Debug, Clone, Default)]
pub struct TokenReconstructor {
    vocabulary: ClassVocabulary,
}

impl TokenReconstructor {
    pub fn new(vocabulary: ClassVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Join token texts in reading order, re-split on whitespace, and merge
    /// known multi-word classes.
    ///
    /// Box and line grouping are discarded here; only reading order survives.
    pub fn reconstruct(&self, tokens: &[NormalizedToken]) -> Vec<String> {
        let joined = tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let words: Vec<&str> = joined.split_whitespace().collect();
        self.merge_words(&words[..])
    }

    /// Greedy longest-match-first merge over a word list.
    pub fn merge_words<S: AsRef<str>>(&self, words: &[S]) -> Vec<String> {
        let mut merged = Vec::with_capacity(words.len());
        let mut cursor = 0;

        while cursor < words.len() {
            match self.vocabulary.longest_match(words, cursor) {
                Some((canonical, count)) => {
                    merged.push(canonical.to_string());
                    cursor += count;
                }
                None => {
                    merged.push(words[cursor].as_ref().to_string());
                    cursor += 1;
                }
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_longest_match_wins() {
        let reconstructor =
            TokenReconstructor::new(ClassVocabulary::new(["Summoner", "Grand Summoner Auriga"]));
        let merged = reconstructor.merge_words(&["Grand", "Summoner", "Auriga", "99"]);
        assert_eq!(merged, vec!["Grand Summoner Auriga", "99"]);
    }

    #[test]
    fn test_resplits_multi_word_detections() {
        let tokens = vec![
            NormalizedToken::new(0, 0, 20, "Player One", 0.9),
            NormalizedToken::new(0, 30, 50, "Level 42", 0.9),
            NormalizedToken::new(80, 30, 50, "dark   knight", 0.9),
        ];
        let merged = TokenReconstructor::default().reconstruct(&tokens);
        assert_eq!(merged, vec!["Player", "One", "Level", "42", "Dark Knight"]);
    }

    #[test]
    fn test_partial_phrase_is_not_merged() {
        let reconstructor = TokenReconstructor::default();
        let merged = reconstructor.merge_words(&["Blood", "Level"]);
        assert_eq!(merged, vec!["Blood", "Level"]);
    }

    #[test]
    fn test_empty_stream() {
        assert!(TokenReconstructor::default().reconstruct(&[]).is_empty());
    }
}
