// Lookup Client Port (eligibility lookup endpoint)

use crate::domain::{Credential, Identifier};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Worker record inside `dados_trabalhador.dados`
///
/// Values stay untyped: the API mixes strings and numbers for amounts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkerRecord {
    #[serde(default)]
    pub nome: Option<serde_json::Value>,
    #[serde(default, rename = "dataNascimento")]
    pub data_nascimento: Option<serde_json::Value>,
    #[serde(default, rename = "dataAdmissao")]
    pub data_admissao: Option<serde_json::Value>,
    #[serde(default, rename = "valorTotalVencimentos")]
    pub valor_total_vencimentos: Option<serde_json::Value>,
    #[serde(default, rename = "valorMargemDisponivel")]
    pub valor_margem_disponivel: Option<serde_json::Value>,
    #[serde(default)]
    pub elegivel: Option<serde_json::Value>,
}

/// `dados` may be absent or an explicit null; both mean no records
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkerDataEnvelope {
    #[serde(default)]
    pub dados: Option<Vec<WorkerRecord>>,
}

/// Lookup response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LookupPayload {
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub erro: Option<bool>,
    #[serde(default)]
    pub dados_trabalhador: Option<WorkerDataEnvelope>,
}

impl LookupPayload {
    pub fn message(&self) -> &str {
        self.mensagem.as_deref().unwrap_or("")
    }

    pub fn records(&self) -> &[WorkerRecord] {
        self.dados_trabalhador
            .as_ref()
            .and_then(|d| d.dados.as_deref())
            .unwrap_or(&[])
    }
}

/// Raw response of one lookup request
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResponse {
    pub status: u16,
    /// Decoded body; `None` when a non-200 body was not JSON
    pub payload: Option<LookupPayload>,
}

/// Transport-level lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl LookupError {
    /// Connection-class failures are retried in the background
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Connection(_) | LookupError::Timeout(_))
    }
}

/// Lookup client trait
///
/// Implementations:
/// - HttpLookupClient (infra-http): bearer-authenticated GET with a 15s timeout
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Perform one lookup for `identifier` using `credential` as bearer token
    async fn lookup(
        &self,
        identifier: &Identifier,
        credential: &Credential,
    ) -> Result<LookupResponse, LookupError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    pub type Reply = Result<LookupResponse, LookupError>;

    /// Canned replies
    pub mod replies {
        use super::*;

        pub fn found(nome: &str, elegivel: &str, mensagem: &str) -> Reply {
            found_flagged(nome, elegivel, mensagem, Some(false))
        }

        /// Worker data alongside an arbitrary `erro` flag (`None` omits it)
        pub fn found_flagged(
            nome: &str,
            elegivel: &str,
            mensagem: &str,
            erro: Option<bool>,
        ) -> Reply {
            Ok(LookupResponse {
                status: 200,
                payload: Some(LookupPayload {
                    mensagem: Some(mensagem.to_string()),
                    erro,
                    dados_trabalhador: Some(WorkerDataEnvelope {
                        dados: Some(vec![WorkerRecord {
                            nome: Some(serde_json::json!(nome)),
                            data_nascimento: Some(serde_json::json!("01/01/1990")),
                            data_admissao: Some(serde_json::json!("10/03/2019")),
                            valor_total_vencimentos: Some(serde_json::json!(4200.5)),
                            valor_margem_disponivel: Some(serde_json::json!("840.10")),
                            elegivel: Some(serde_json::json!(elegivel)),
                        }]),
                    }),
                }),
            })
        }

        pub fn empty(mensagem: &str) -> Reply {
            Ok(LookupResponse {
                status: 200,
                payload: Some(LookupPayload {
                    mensagem: Some(mensagem.to_string()),
                    erro: Some(false),
                    dados_trabalhador: Some(WorkerDataEnvelope {
                        dados: Some(vec![]),
                    }),
                }),
            })
        }

        pub fn rejected(mensagem: &str) -> Reply {
            Ok(LookupResponse {
                status: 200,
                payload: Some(LookupPayload {
                    mensagem: Some(mensagem.to_string()),
                    erro: Some(true),
                    dados_trabalhador: None,
                }),
            })
        }

        pub fn token_invalid() -> Reply {
            rejected("Token inválido ou expirado")
        }

        pub fn http(status: u16) -> Reply {
            Ok(LookupResponse {
                status,
                payload: None,
            })
        }

        pub fn connection_refused() -> Reply {
            Err(LookupError::Connection(
                "Max retries exceeded: connection refused".to_string(),
            ))
        }
    }

    /// Lookup client answering from per-identifier scripts
    ///
    /// When an identifier's script is exhausted the fallback reply is used.
    pub struct ScriptedLookupClient {
        scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
        fallback: Reply,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedLookupClient {
        pub fn new(fallback: Reply) -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn script(&self, identifier: &str, replies: Vec<Reply>) {
            self.scripts
                .lock()
                .unwrap()
                .entry(identifier.to_string())
                .or_default()
                .extend(replies);
        }

        /// (identifier, token) pairs in call order
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LookupClient for ScriptedLookupClient {
        async fn lookup(
            &self,
            identifier: &Identifier,
            credential: &Credential,
        ) -> Result<LookupResponse, LookupError> {
            self.calls
                .lock()
                .unwrap()
                .push((identifier.to_string(), credential.token().to_string()));

            let scripted = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(identifier.as_str())
                .and_then(|q| q.pop_front());
            scripted.unwrap_or_else(|| self.fallback.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> LookupPayload {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_null_dados_decodes_as_no_records() {
        let payload = decode(
            r#"{"erro": false, "mensagem": "sem vinculo", "dados_trabalhador": {"dados": null}}"#,
        );
        assert!(payload.records().is_empty());
        assert_eq!(payload.message(), "sem vinculo");
    }

    #[test]
    fn test_missing_envelope_and_flag() {
        let payload = decode(r#"{"mensagem": "ok"}"#);
        assert!(payload.records().is_empty());
        assert_eq!(payload.erro, None);

        let payload = decode(r#"{"dados_trabalhador": null}"#);
        assert!(payload.records().is_empty());
    }

    #[test]
    fn test_records_keep_untyped_values() {
        let payload = decode(
            r#"{"erro": false, "dados_trabalhador": {"dados": [
                {"nome": "ANA", "valorTotalVencimentos": 4200.5, "elegivel": "SIM"}
            ]}}"#,
        );
        let records = payload.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nome, Some(serde_json::json!("ANA")));
        assert_eq!(
            records[0].valor_total_vencimentos,
            Some(serde_json::json!(4200.5))
        );
        assert_eq!(records[0].data_admissao, None);
    }
}
