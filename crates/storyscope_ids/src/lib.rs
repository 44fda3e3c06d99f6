//! Shared identifier wrappers for Storyscope.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

/// Batch identifier.
///
/// Format: `YYYYMMDD_HHMMSS-xxxxxxxx` (UTC creation second plus 8 random hex
/// characters). The timestamp keeps ids sortable and readable in the status
/// directory; the suffix keeps two batches created in the same second apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new() -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", stamp, &suffix[..8]))
    }

    /// Parse an id supplied by a caller.
    ///
    /// Ids name files in the status directory, so only ASCII alphanumerics,
    /// `_` and `-` are accepted. Plain timestamp ids are still valid.
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        if value.is_empty() {
            return Err(IdParseError::new("Invalid batch ID: empty"));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(IdParseError::new(format!(
                "Invalid batch ID: unexpected character '{}'",
                bad
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a persisted analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| IdParseError::new(format!("Invalid record ID: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids_are_distinct_within_one_second() {
        let a = BatchId::new();
        let b = BatchId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), "20240101_120000-0123abcd".len());
    }

    #[test]
    fn test_batch_id_parse() {
        assert!(BatchId::parse("20240101_120000").is_ok());
        assert!(BatchId::parse("20240101_120000-0123abcd").is_ok());
        assert!(BatchId::parse("").is_err());
        assert!(BatchId::parse("../etc/passwd").is_err());
    }

    #[test]
    fn test_record_id_roundtrip_text() {
        let id: RecordId = "42".parse().unwrap();
        assert_eq!(id, RecordId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<RecordId>().is_err());
    }
}
