// HTTP TokenIssuer

use crate::config::ApiConfig;
use async_trait::async_trait;
use eligibility_core::error::Result;
use eligibility_core::port::{AuthError, TokenIssuer};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// GET on the token endpoint with a static Basic credential
pub struct HttpTokenIssuer {
    http: reqwest::Client,
    url: String,
    auth: String,
}

impl HttpTokenIssuer {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: ApiConfig::build_client(config.token_timeout)?,
            url: config.token_url.clone(),
            auth: config.token_auth.clone(),
        })
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue_token(&self) -> std::result::Result<String, AuthError> {
        let response = self
            .http
            .get(&self.url)
            .header(AUTHORIZATION, &self.auth)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), "Token endpoint answered");

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|_| AuthError::MissingToken(body.clone()))?;
        match parsed.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AuthError::MissingToken(body)),
        }
    }
}
