//! Known class names used to fuse multi-word classes in the token stream.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Longest class name, in words, considered when merging tokens.
const MAX_PHRASE_WORDS: usize = 3;

const STANDARD_CLASSES: &[&str] = &[
    // Tier 1-3
    "Adventurer",
    "Warrior",
    "Mage",
    "Thief",
    "Knight",
    "Sorcerer",
    "Ranger",
    "Spellsword",
    "Bard",
    "Monk",
    // Tier 4-6
    "Paladin",
    "Warlock",
    "Thaumaturge",
    "Dragoon",
    "Mystic",
    "Druid",
    "Hunter",
    "Summoner",
    "Sentinel",
    "Valkyrie",
    "Bladedancer",
    "Vampire",
    "Lich",
    "Sage",
    "Tamer",
    "Beastmaster",
    "Dark Knight",
    "Blood Mage",
    "Magic Knight",
    "Dragon Rider",
    "War Priest",
    // Tier 7+
    "Realmshifter",
    "Ascended",
    "Wanderer",
    "Grand Summoner",
    "Vampire Lord",
    "Grand Summoner Auriga",
    "Grand Summoner Hydron",
    "Grand Summoner Terra",
];

/// Recurring OCR misreads of class names.
const CORRECTIONS: &[(&str, &str)] = &[("snelleward", "Spellsword")];

lazy_static! {
    static ref STANDARD: ClassVocabulary = ClassVocabulary::new(STANDARD_CLASSES.iter().copied())
        .with_corrections(CORRECTIONS.iter().copied());
}

/// Case-insensitive set of known class names.
#[derive(Debug, Clone)]
pub struct ClassVocabulary {
    /// Lowercased phrase -> canonical casing.
    entries: HashMap<String, String>,
    /// Lowercased misread -> canonical casing.
    corrections: HashMap<String, String>,
}

impl ClassVocabulary {
    /// Build a vocabulary from canonical class names.
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = classes
            .into_iter()
            .map(|c| {
                let canonical = c.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
                (canonical.to_lowercase(), canonical)
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Self {
            entries,
            corrections: HashMap::new(),
        }
    }

    /// Add misread -> canonical corrections.
    pub fn with_corrections<I, S, T>(mut self, corrections: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        for (misread, canonical) in corrections {
            self.corrections
                .insert(misread.as_ref().to_lowercase(), canonical.as_ref().to_string());
        }
        self
    }

    /// The built-in class list.
    pub fn standard() -> &'static ClassVocabulary {
        &STANDARD
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical casing of a known class name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(&lookup_key(name)).map(String::as_str)
    }

    /// Longest multi-word class starting at `start`.
    ///
    /// Tries a three-word window, then a two-word window. Single words are
    /// never reported: they need no merging. Returns the canonical name and
    /// the number of words it covers.
    pub fn longest_match<S: AsRef<str>>(&self, words: &[S], start: usize) -> Option<(&str, usize)> {
        for count in (2..=MAX_PHRASE_WORDS).rev() {
            let Some(window) = words.get(start..start + count) else {
                continue;
            };
            let phrase = window
                .iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(canonical) = self.entries.get(&phrase) {
                return Some((canonical.as_str(), count));
            }
        }
        None
    }

    /// Map a raw class string to its canonical form.
    ///
    /// Known misreads are corrected, known classes get canonical casing, and
    /// anything else is returned unchanged.
    pub fn canonicalize(&self, raw: &str) -> String {
        if let Some(corrected) = self.corrections.get(&lookup_key(raw)) {
            return corrected.clone();
        }
        self.lookup(raw).unwrap_or(raw).to_string()
    }
}

/// Collapse runs of whitespace and lowercase.
fn lookup_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::standard().clone()
    }
}
