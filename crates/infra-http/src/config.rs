// Remote endpoint settings

use eligibility_core::error::{AppError, Result};
use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://webservice.facta.com.br/gera-token";
pub const DEFAULT_LOOKUP_URL: &str =
    "https://webservice.facta.com.br/consignado-trabalhador/autoriza-consulta";

/// Endpoints, credentials and timeouts for both remote services
#[derive(Clone)]
pub struct ApiConfig {
    pub token_url: String,
    pub lookup_url: String,
    /// Full `Authorization` header value for the token endpoint
    pub token_auth: String,
    pub token_timeout: Duration,
    pub lookup_timeout: Duration,
}

impl ApiConfig {
    /// Defaults for everything except the token credential
    pub fn new(token_auth: impl Into<String>) -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            token_auth: token_auth.into(),
            token_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(15),
        }
    }

    pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {}", e)))
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("token_url", &self.token_url)
            .field("lookup_url", &self.lookup_url)
            .field("token_auth", &"<redacted>")
            .field("token_timeout", &self.token_timeout)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_credential() {
        let config = ApiConfig::new("Basic c2VjcmV0");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("c2VjcmV0"));
        assert!(printed.contains("gera-token"));
    }
}
