// Token Issuer Port (token-issuing endpoint)

use async_trait::async_trait;
use thiserror::Error;

/// Token issuance failures
///
/// Fatal to the in-flight call, never to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    #[error("token endpoint returned HTTP {0}")]
    Status(u16),

    #[error("no token in response: {0}")]
    MissingToken(String),
}

/// Issues a fresh bearer token
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Request a new token
    ///
    /// # Errors
    /// - AuthError::Transport if the endpoint cannot be reached
    /// - AuthError::Status for non-success responses
    /// - AuthError::MissingToken if the body has no `token` field
    async fn issue_token(&self) -> Result<String, AuthError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Issues "token-1", "token-2", ... unless a scripted failure is queued
    #[derive(Default)]
    pub struct SequentialTokenIssuer {
        failures: Mutex<VecDeque<AuthError>>,
        call_count: Mutex<usize>,
    }

    impl SequentialTokenIssuer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next call fail with `error`
        pub fn fail_next(&self, error: AuthError) {
            self.failures.lock().unwrap().push_back(error);
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl TokenIssuer for SequentialTokenIssuer {
        async fn issue_token(&self) -> Result<String, AuthError> {
            let count = {
                let mut count = self.call_count.lock().unwrap();
                *count += 1;
                *count
            };
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(format!("token-{}", count))
        }
    }
}
