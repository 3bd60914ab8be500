//! Player record data models.

use serde::{Deserialize, Serialize};

/// One roster entry recovered from a screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// In-game name, possibly several words.
    pub username: String,

    /// Character level. `0` when the level marker was unreadable.
    pub level: u32,

    /// Class name in vocabulary casing when known, possibly several words.
    #[serde(rename = "class", alias = "class_name")]
    pub class_name: String,
}

impl PlayerRecord {
    pub fn new(username: impl Into<String>, level: u32, class_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            level,
            class_name: class_name.into(),
        }
    }

    /// Identity used for duplicate suppression.
    pub fn key(&self) -> (&str, u32) {
        (&self.username, self.level)
    }

    /// Both text fields are present.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.class_name.trim().is_empty()
    }
}

impl std::fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Lv. {}) {}", self.username, self.level, self.class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_class_field() {
        let record = PlayerRecord::new("PlayerOne", 42, "Grand Summoner Hydron");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"username":"PlayerOne","level":42,"class":"Grand Summoner Hydron"}"#
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(PlayerRecord::new("a b", 0, "Mage").is_complete());
        assert!(!PlayerRecord::new(" ", 10, "Mage").is_complete());
        assert!(!PlayerRecord::new("Someone", 10, "").is_complete());
    }
}
