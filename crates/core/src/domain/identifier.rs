// Identifier & Batch value types

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display width of a CPF (zero-left-padded)
pub const IDENTIFIER_WIDTH: usize = 11;

/// Subject identifier (CPF) exactly as supplied by the caller.
///
/// Stored verbatim; only [`Identifier::padded`] normalizes it for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::InvalidIdentifier(
                "identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Parse a whole list, failing on the first invalid entry
    pub fn parse_all<I, S>(raw: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        raw.into_iter().map(Self::parse).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn padded(&self) -> String {
        pad_identifier(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim and zero-left-pad a stored identifier to [`IDENTIFIER_WIDTH`].
/// Longer values are returned trimmed but otherwise untouched.
pub fn pad_identifier(raw: &str) -> String {
    format!("{:0>width$}", raw.trim(), width = IDENTIFIER_WIDTH)
}

/// Caller-defined batch grouping key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::InvalidBatchId(
                "batch id must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_keeps_stored_value() {
        let id = Identifier::parse("1234567890").unwrap();
        assert_eq!(id.as_str(), "1234567890");
        assert_eq!(id.padded(), "01234567890");
    }

    #[test]
    fn test_padding_trims_whitespace() {
        assert_eq!(pad_identifier(" 123 "), "00000000123");
        assert_eq!(pad_identifier("11111111111"), "11111111111");
        assert_eq!(pad_identifier("123456789012"), "123456789012");
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(Identifier::parse("   ").is_err());
        assert!(BatchId::parse("").is_err());
        assert!(Identifier::parse_all(vec!["1", ""]).is_err());
    }
}
