//! Cache entry and key pattern types

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A cached value with its expiry metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub data: serde_json::Value,
    /// Write time (Unix ms)
    pub timestamp: i64,
    /// Time to live (ms)
    pub ttl_ms: i64,
    pub schema_version: String,
}

impl CacheEntry {
    /// An entry is valid iff written under the current schema and younger than its TTL.
    pub fn is_valid(&self, schema_version: &str, now_millis: i64) -> bool {
        self.schema_version == schema_version
            && now_millis.saturating_sub(self.timestamp) < self.ttl_ms
    }
}

/// Selects a group of cache keys for invalidation
#[derive(Debug, Clone)]
pub enum KeyPattern {
    Prefix(String),
    Regex(Regex),
}

impl KeyPattern {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Compile a regular expression pattern.
    pub fn regex(pattern: &str) -> crate::Result<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|error| crate::Error::InvalidInput(format!("invalid key pattern: {error}")))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
            Self::Regex(regex) => regex.is_match(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timestamp: i64, ttl_ms: i64, version: &str) -> CacheEntry {
        CacheEntry {
            key: "k".to_string(),
            data: serde_json::Value::Null,
            timestamp,
            ttl_ms,
            schema_version: version.to_string(),
        }
    }

    #[test]
    fn validity_requires_matching_schema_and_age_below_ttl() {
        let entry = entry(1_000, 500, "1");
        assert!(entry.is_valid("1", 1_000));
        assert!(entry.is_valid("1", 1_499));
        assert!(!entry.is_valid("1", 1_500));
        assert!(!entry.is_valid("2", 1_000));
    }

    #[test]
    fn key_patterns_match_prefix_and_regex() {
        let prefix = KeyPattern::prefix("appointments:");
        assert!(prefix.matches("appointments:salon-1"));
        assert!(!prefix.matches("clients:salon-1"));

        let regex = KeyPattern::regex(r"^appointments:salon-\d+$").unwrap();
        assert!(regex.matches("appointments:salon-42"));
        assert!(!regex.matches("appointments:salon-x"));

        assert!(KeyPattern::regex("(").is_err());
    }
}
