use serde::{Deserialize, Serialize};

use super::SyncedEntity;

/// A filename pattern the server queues for download automatically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutoQueuePattern {
    pub pattern: String,
}

impl AutoQueuePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl SyncedEntity for AutoQueuePattern {
    fn key(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for AutoQueuePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_pattern_is_invalid() {
        assert!(!AutoQueuePattern::new("").is_valid());
        assert!(!AutoQueuePattern::new("   ").is_valid());
        assert!(AutoQueuePattern::new("*.mkv").is_valid());
    }

    #[test]
    fn deserializes_fetch_payload() {
        let list: Vec<AutoQueuePattern> =
            serde_json::from_str(r#"[{"pattern":"*.mkv"},{"pattern":"show s01*"}]"#)
                .expect("valid payload");
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].key(), "show s01*");
    }
}
