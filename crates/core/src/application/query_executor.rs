// Query Executor - one lookup, classified into an Outcome

use crate::application::token_manager::TokenManager;
use crate::domain::{eligibility_status, Credential, Identifier, Outcome, ResultFields, EMPTY_FIELD};
use crate::port::{LookupClient, LookupResponse, WorkerRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Status the API answers with for a well-formed lookup
const HTTP_OK: u16 = 200;

/// Prefix (case-insensitive) of the API message for a rejected token
const INVALID_TOKEN_PREFIX: &str = "token inválido";

/// Which caller a lookup is classified for
///
/// The sweep trusts the API error flag and treats a missing flag as an
/// error. Reprocessing ignores the flag and looks at the worker data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    Sweep,
    Reprocessing,
}

/// Performs lookups with a valid credential and classifies the response
pub struct QueryExecutor {
    client: Arc<dyn LookupClient>,
    tokens: Arc<TokenManager>,
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn LookupClient>, tokens: Arc<TokenManager>) -> Self {
        Self { client, tokens }
    }

    /// Single lookup with the given credential (no refresh)
    pub async fn lookup(
        &self,
        identifier: &Identifier,
        credential: &Credential,
        mode: LookupMode,
    ) -> Outcome {
        match self.client.lookup(identifier, credential).await {
            Ok(response) => classify(&response, mode),
            Err(e) if e.is_transient() => Outcome::ConnectionError {
                message: e.to_string(),
            },
            Err(e) => Outcome::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Obtain a credential and look `identifier` up.
    ///
    /// On an invalid-token answer the credential is refreshed and the request
    /// is retried exactly once; the second answer is final.
    pub async fn execute(&self, identifier: &Identifier, mode: LookupMode) -> Outcome {
        let credential = match self.tokens.ensure_credential().await {
            Ok(c) => c,
            Err(e) => {
                return Outcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        let outcome = self.lookup(identifier, &credential, mode).await;
        debug!(identifier = %identifier, outcome = outcome.kind(), "Lookup classified");

        if let Outcome::AuthRejected { message } = &outcome {
            warn!(identifier = %identifier, message = %message, "Token rejected, refreshing");
            let fresh = match self.tokens.refresh_after_rejection(&credential).await {
                Ok(c) => c,
                Err(e) => {
                    return Outcome::Failed {
                        message: e.to_string(),
                    }
                }
            };
            return self.lookup(identifier, &fresh, mode).await;
        }

        outcome
    }
}

/// Classify a raw lookup response.
///
/// Order matters: status first, then the token check, then the API error
/// flag (sweep only), then presence of worker data.
pub fn classify(response: &LookupResponse, mode: LookupMode) -> Outcome {
    if response.status != HTTP_OK {
        return Outcome::HttpError {
            status: response.status,
        };
    }

    let Some(payload) = response.payload.as_ref() else {
        return Outcome::Failed {
            message: "empty response body".to_string(),
        };
    };
    let message = payload.message();

    if message.to_lowercase().starts_with(INVALID_TOKEN_PREFIX) {
        return Outcome::AuthRejected {
            message: message.to_string(),
        };
    }

    if mode == LookupMode::Sweep && payload.erro != Some(false) {
        return Outcome::Rejected {
            message: payload
                .mensagem
                .clone()
                .unwrap_or_else(|| format!("HTTP error {}", response.status)),
        };
    }

    match payload.records().first() {
        Some(record) => Outcome::Found(fields_from_record(record, message)),
        None => Outcome::NoData {
            message: message.to_string(),
        },
    }
}

/// Build result fields from the first worker record
fn fields_from_record(record: &WorkerRecord, message: &str) -> ResultFields {
    let elegivel = record.elegivel.as_ref().and_then(|v| v.as_str());
    ResultFields {
        nome: field_text(&record.nome),
        data_nascimento: field_text(&record.data_nascimento),
        data_admissao: field_text(&record.data_admissao),
        valor_liberado: field_text(&record.valor_total_vencimentos),
        margem: field_text(&record.valor_margem_disponivel),
        elegivel: field_text(&record.elegivel),
        status: eligibility_status(elegivel, message).to_string(),
        mensagem: message.to_string(),
    }
}

/// Absent, null and empty-string values render as "-"
fn field_text(value: &Option<serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => EMPTY_FIELD.to_string(),
        Some(serde_json::Value::String(s)) if s.is_empty() => EMPTY_FIELD.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
