// HTTP LookupClient

use crate::config::ApiConfig;
use async_trait::async_trait;
use eligibility_core::domain::{Credential, Identifier};
use eligibility_core::error::Result;
use eligibility_core::port::{LookupClient, LookupError, LookupPayload, LookupResponse};
use reqwest::header::ACCEPT;
use tracing::debug;

/// Bearer-authenticated GET `?cpf=<identifier>`
pub struct HttpLookupClient {
    http: reqwest::Client,
    url: String,
}

impl HttpLookupClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: ApiConfig::build_client(config.lookup_timeout)?,
            url: config.lookup_url.clone(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        LookupError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        LookupError::Connection(err.to_string())
    } else if err.is_decode() || err.is_body() {
        LookupError::Decode(err.to_string())
    } else {
        LookupError::Other(err.to_string())
    }
}

#[async_trait]
impl LookupClient for HttpLookupClient {
    async fn lookup(
        &self,
        identifier: &Identifier,
        credential: &Credential,
    ) -> std::result::Result<LookupResponse, LookupError> {
        let response = self
            .http
            .get(&self.url)
            .bearer_auth(credential.token())
            .header(ACCEPT, "application/json")
            .query(&[("cpf", identifier.as_str())])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(identifier = %identifier, status, bytes = body.len(), "Lookup answered");

        let payload = if status == 200 {
            let parsed: LookupPayload = serde_json::from_slice(&body)
                .map_err(|e| LookupError::Decode(e.to_string()))?;
            Some(parsed)
        } else {
            // Error bodies are informational only
            serde_json::from_slice::<LookupPayload>(&body).ok()
        };

        Ok(LookupResponse { status, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> HttpLookupClient {
        let mut config = ApiConfig::new("Basic x");
        config.lookup_url = format!("{}/autoriza-consulta", server.uri());
        config.lookup_timeout = timeout;
        HttpLookupClient::new(&config).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("tok-123", 0, 59 * 60 * 1000)
    }

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_sends_bearer_and_cpf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/autoriza-consulta"))
            .and(query_param("cpf", "11111111111"))
            .and(header("authorization", "Bearer tok-123"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "erro": false,
                "mensagem": "Consulta realizada",
                "dados_trabalhador": {"dados": [{
                    "nome": "MARIA",
                    "dataNascimento": "01/01/1990",
                    "dataAdmissao": "10/03/2019",
                    "valorTotalVencimentos": 4200.5,
                    "valorMargemDisponivel": "840.10",
                    "elegivel": "SIM"
                }]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let response = client.lookup(&id("11111111111"), &credential()).await.unwrap();

        assert_eq!(response.status, 200);
        let payload = response.payload.unwrap();
        assert_eq!(payload.message(), "Consulta realizada");
        assert_eq!(payload.records().len(), 1);
        assert_eq!(
            payload.records()[0].elegivel,
            Some(serde_json::json!("SIM"))
        );
    }

    #[tokio::test]
    async fn test_null_dados_is_an_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "erro": false,
                "mensagem": "Nenhum vinculo",
                "dados_trabalhador": {"dados": null}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let response = client.lookup(&id("1"), &credential()).await.unwrap();

        let payload = response.payload.unwrap();
        assert!(payload.records().is_empty());
        assert_eq!(payload.message(), "Nenhum vinculo");
    }

    #[tokio::test]
    async fn test_non_200_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let response = client.lookup(&id("1"), &credential()).await.unwrap();

        assert_eq!(response.status, 503);
        assert!(response.payload.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_on_200_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client.lookup(&id("1"), &credential()).await.unwrap_err();

        assert!(matches!(err, LookupError::Decode(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"erro": false}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(100));
        let err = client.lookup(&id("1"), &credential()).await.unwrap_err();

        assert!(matches!(err, LookupError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let mut config = ApiConfig::new("Basic x");
        config.lookup_url = "http://127.0.0.1:9/autoriza-consulta".to_string();
        let client = HttpLookupClient::new(&config).unwrap();

        let err = client.lookup(&id("1"), &credential()).await.unwrap_err();
        assert!(matches!(err, LookupError::Connection(_)));
    }
}
