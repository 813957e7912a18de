// Token Manager - single shared bearer credential with lazy refresh

use crate::domain::Credential;
use crate::port::{AuthError, TimeProvider, TokenIssuer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Validity window applied to every issued token (59 minutes).
/// Stays under the server-side 60 minute TTL.
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(59 * 60);

/// Holds the process-wide credential.
///
/// Refreshes are lazy (on the first call after expiry) and serialized by the
/// mutex, so a burst of callers after expiry triggers a single issuance.
pub struct TokenManager {
    issuer: Arc<dyn TokenIssuer>,
    time_provider: Arc<dyn TimeProvider>,
    validity_ms: i64,
    current: Mutex<Option<Credential>>,
}

impl TokenManager {
    pub fn new(issuer: Arc<dyn TokenIssuer>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::with_validity(issuer, time_provider, DEFAULT_TOKEN_VALIDITY)
    }

    pub fn with_validity(
        issuer: Arc<dyn TokenIssuer>,
        time_provider: Arc<dyn TimeProvider>,
        validity: Duration,
    ) -> Self {
        Self {
            issuer,
            time_provider,
            validity_ms: validity.as_millis() as i64,
            current: Mutex::new(None),
        }
    }

    /// Return the held credential while `now < expires_at`, otherwise issue
    /// a new one.
    ///
    /// # Errors
    /// AuthError if issuance fails; the held credential is cleared.
    pub async fn ensure_credential(&self) -> Result<Credential, AuthError> {
        let mut current = self.current.lock().await;
        let now = self.time_provider.now_millis();

        if let Some(credential) = current.as_ref() {
            if credential.is_valid_at(now) {
                return Ok(credential.clone());
            }
            debug!(expired_at = credential.expires_at(), "Credential expired");
        }

        self.issue_locked(&mut current).await
    }

    /// Replace a credential the API rejected.
    ///
    /// If another caller already replaced `rejected`, the newer credential is
    /// returned without a second issuance.
    pub async fn refresh_after_rejection(
        &self,
        rejected: &Credential,
    ) -> Result<Credential, AuthError> {
        let mut current = self.current.lock().await;
        let now = self.time_provider.now_millis();

        if let Some(credential) = current.as_ref() {
            if credential.token() != rejected.token() && credential.is_valid_at(now) {
                return Ok(credential.clone());
            }
        }

        self.issue_locked(&mut current).await
    }

    async fn issue_locked(&self, slot: &mut Option<Credential>) -> Result<Credential, AuthError> {
        match self.issuer.issue_token().await {
            Ok(token) => {
                let issued_at = self.time_provider.now_millis();
                let credential = Credential::new(token, issued_at, self.validity_ms);
                info!(
                    token = %credential.redacted(),
                    expires_at = %crate::port::time_provider::format_millis(credential.expires_at()),
                    "Token issued"
                );
                *slot = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                error!(error = %e, "Token issuance failed");
                *slot = None;
                Err(e)
            }
        }
    }
}
