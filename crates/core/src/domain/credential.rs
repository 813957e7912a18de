// Bearer credential issued by the token endpoint

use std::fmt;

/// Number of token characters that may appear in logs
const REDACTED_PREFIX_LEN: usize = 15;

/// Bearer token with its expiry (epoch ms).
///
/// Immutable: a refresh replaces the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: i64,
}

impl Credential {
    pub fn new(token: impl Into<String>, issued_at: i64, validity_ms: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: issued_at + validity_ms,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// A credential is usable strictly before its expiry instant
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }

    /// Log-safe rendering of the token
    pub fn redacted(&self) -> String {
        let prefix: String = self.token.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.redacted())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_exclusive() {
        let cred = Credential::new("abc", 1_000, 500);
        assert!(cred.is_valid_at(1_499));
        assert!(!cred.is_valid_at(1_500));
    }

    #[test]
    fn test_debug_never_prints_full_token() {
        let cred = Credential::new("0123456789abcdefSECRET", 0, 1);
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("0123456789abcde..."));
        assert!(!rendered.contains("SECRET"));
    }
}
