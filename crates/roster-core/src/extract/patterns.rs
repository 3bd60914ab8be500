//! Regex patterns for roster line matching.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "Level 42 Grand Summoner" including common OCR misreads of "Level"
    pub static ref LEVEL_LINE: Regex = Regex::new(
        r"(?i)(?:level|lavel|levei|ievei|ieve1|seeelevcle|lvl)\s*(\d{1,3})\s+(.+)"
    ).unwrap();

    // Timestamps such as "31/3/2025" shown next to roster entries
    pub static ref DATE_LINE: Regex = Regex::new(
        r"\d{1,2}/\d{1,2}/\d{4}"
    ).unwrap();

    // Leading icon/noise glyphs before a username
    pub static ref USERNAME_NOISE: Regex = Regex::new(
        r"^[+=%&;:\s]*"
    ).unwrap();

    // Leading alphabetic run of a class remainder, dropping trailing noise
    pub static ref CLASS_PREFIX: Regex = Regex::new(
        r"^([a-zA-Z][a-zA-Z\s]+)"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_line_misreads() {
        for text in ["Level 42 Mage", "Lavel 7 Dark Knight", "LeveL300 Bard", "Ievei 12 Monk"] {
            assert!(LEVEL_LINE.is_match(text), "{text}");
        }
        let caps = LEVEL_LINE.captures("Lavel 7 Dark Knight").unwrap();
        assert_eq!(&caps[1], "7");
        assert_eq!(&caps[2], "Dark Knight");
    }

    #[test]
    fn test_level_line_requires_class() {
        assert!(!LEVEL_LINE.is_match("Level 42"));
        assert!(!LEVEL_LINE.is_match("PlayerOne"));
    }

    #[test]
    fn test_date_line() {
        assert!(DATE_LINE.is_match("Last seen 31/3/2025"));
        assert!(!DATE_LINE.is_match("Level 31 Mage"));
    }

    #[test]
    fn test_username_noise() {
        assert_eq!(USERNAME_NOISE.replace("+ = PlayerOne", ""), "PlayerOne");
        assert_eq!(USERNAME_NOISE.replace("Player+One", ""), "Player+One");
    }

    #[test]
    fn test_class_prefix() {
        let caps = CLASS_PREFIX.captures("Spellsword ©@ 12").unwrap();
        assert_eq!(caps[1].trim(), "Spellsword");
        assert!(CLASS_PREFIX.captures("@@").is_none());
    }
}
