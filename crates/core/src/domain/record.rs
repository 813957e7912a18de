// Query result model and the legacy stored-string encoding
//
// Stored format (consumed downstream, must stay bit-compatible):
//   "Nome: .., Data Nascimento: .., Data Admissao: .., Valor Liberado: ..,
//    Margem: .., Elegível: .., Status: .., Mensagem: .."
// Readers split on ',' then on the first ':'. Later keys win.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STATUS_AUTHORIZED: &str = "Autorizado";
pub const STATUS_NOT_AUTHORIZED: &str = "Não autorizado";
pub const STATUS_PENDING: &str = "Pending";

/// Placeholder for absent fields
pub const EMPTY_FIELD: &str = "-";

const KEY_NAME: &str = "Nome";
const KEY_BIRTH_DATE: &str = "Data Nascimento";
const KEY_ADMISSION_DATE: &str = "Data Admissao";
const KEY_RELEASED_AMOUNT: &str = "Valor Liberado";
const KEY_MARGIN: &str = "Margem";
const KEY_ELIGIBLE: &str = "Elegível";
const KEY_STATUS: &str = "Status";
const KEY_MESSAGE: &str = "Mensagem";

/// Structured lookup result (one per identifier/batch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFields {
    pub nome: String,
    pub data_nascimento: String,
    pub data_admissao: String,
    pub valor_liberado: String,
    pub margem: String,
    pub elegivel: String,
    pub status: String,
    pub mensagem: String,
}

impl ResultFields {
    /// Result with no worker data: every field "-" and status "Não autorizado"
    pub fn not_authorized(mensagem: impl Into<String>) -> Self {
        Self {
            nome: EMPTY_FIELD.to_string(),
            data_nascimento: EMPTY_FIELD.to_string(),
            data_admissao: EMPTY_FIELD.to_string(),
            valor_liberado: EMPTY_FIELD.to_string(),
            margem: EMPTY_FIELD.to_string(),
            elegivel: EMPTY_FIELD.to_string(),
            status: STATUS_NOT_AUTHORIZED.to_string(),
            mensagem: mensagem.into(),
        }
    }

    /// Render in the fixed legacy key order
    pub fn render(&self) -> String {
        format!(
            "{KEY_NAME}: {}, {KEY_BIRTH_DATE}: {}, {KEY_ADMISSION_DATE}: {}, \
             {KEY_RELEASED_AMOUNT}: {}, {KEY_MARGIN}: {}, {KEY_ELIGIBLE}: {}, \
             {KEY_STATUS}: {}, {KEY_MESSAGE}: {}",
            self.nome,
            self.data_nascimento,
            self.data_admissao,
            self.valor_liberado,
            self.margem,
            self.elegivel,
            self.status,
            self.mensagem,
        )
    }
}

/// Event appended to a stored result by the reprocessing engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Retry answered with a non-200 status
    HttpError { status: u16 },
    /// Retry failed before a response was classified
    Exception { message: String },
    /// Attempt ceiling reached; no further retries
    AttemptsExhausted { attempts: u32 },
}

impl Annotation {
    pub fn render(&self) -> String {
        match self {
            Annotation::HttpError { status } => {
                format!("{KEY_MESSAGE}: HTTP error {} during reprocessing", status)
            }
            Annotation::Exception { message } => {
                format!("{KEY_MESSAGE}: Reprocessing error ({})", message)
            }
            Annotation::AttemptsExhausted { attempts } => format!(
                "{KEY_STATUS}: Failed after {} attempts, {KEY_MESSAGE}: backend offline or connection error",
                attempts
            ),
        }
    }
}

/// Base content of a stored result, before annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultBody {
    /// Registered, not yet looked up
    Pending,
    /// Handed to the reprocessing engine
    Reprocessing {
        attempt: u32,
        max_attempts: u32,
        message: String,
    },
    /// Final (or latest) lookup result
    Completed { fields: ResultFields },
    /// Row written by another producer; kept verbatim
    Legacy { text: String },
}

impl ResultBody {
    fn render(&self) -> String {
        match self {
            ResultBody::Pending => STATUS_PENDING.to_string(),
            ResultBody::Reprocessing {
                attempt,
                max_attempts,
                message,
            } => format!(
                "{KEY_STATUS}: Reprocessing ({}/{}), {KEY_MESSAGE}: {}",
                attempt, max_attempts, message
            ),
            ResultBody::Completed { fields } => fields.render(),
            ResultBody::Legacy { text } => text.clone(),
        }
    }
}

/// Typed stored result: a body plus the ordered annotation history.
///
/// Only [`StoredResult::render`] produces the legacy string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    pub body: ResultBody,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl StoredResult {
    pub fn pending() -> Self {
        Self::from_body(ResultBody::Pending)
    }

    pub fn completed(fields: ResultFields) -> Self {
        Self::from_body(ResultBody::Completed { fields })
    }

    pub fn reprocessing(attempt: u32, max_attempts: u32, message: impl Into<String>) -> Self {
        Self::from_body(ResultBody::Reprocessing {
            attempt,
            max_attempts,
            message: message.into(),
        })
    }

    pub fn legacy(text: impl Into<String>) -> Self {
        Self::from_body(ResultBody::Legacy { text: text.into() })
    }

    fn from_body(body: ResultBody) -> Self {
        Self {
            body,
            annotations: Vec::new(),
        }
    }

    pub fn annotate(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.body, ResultBody::Pending) && self.annotations.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = self.body.render();
        for annotation in &self.annotations {
            out.push_str(", ");
            out.push_str(&annotation.render());
        }
        out
    }

    pub fn status_fields(&self) -> StatusFields {
        StatusFields::parse(&self.render())
    }
}

/// Fields recovered from a stored string by the legacy reader rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusFields {
    pub nome: String,
    pub data_nascimento: String,
    pub data_admissao: String,
    pub valor_liberado: String,
    pub margem: String,
    pub elegivel: String,
    pub status: String,
    pub mensagem: String,
}

impl StatusFields {
    /// Split on ',', then on the first ':'; trim both sides; later keys
    /// override earlier ones; missing keys become "-".
    pub fn parse(text: &str) -> Self {
        let mut parts: HashMap<&str, &str> = HashMap::new();
        for piece in text.split(',') {
            if let Some((key, value)) = piece.split_once(':') {
                parts.insert(key.trim(), value.trim());
            }
        }
        let get = |key: &str| parts.get(key).copied().unwrap_or(EMPTY_FIELD).to_string();

        Self {
            nome: get(KEY_NAME),
            data_nascimento: get(KEY_BIRTH_DATE),
            data_admissao: get(KEY_ADMISSION_DATE),
            valor_liberado: get(KEY_RELEASED_AMOUNT),
            margem: get(KEY_MARGIN),
            elegivel: get(KEY_ELIGIBLE),
            status: get(KEY_STATUS),
            mensagem: get(KEY_MESSAGE),
        }
    }
}

/// One persisted row of the result store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    /// Auto-increment sequence; higher is newer
    pub id: i64,
    /// Identifier as originally supplied
    pub identifier: String,
    pub result: StoredResult,
    /// Local time, "%Y-%m-%d %H:%M:%S"
    pub timestamp: String,
    pub batch_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorized_fields() -> ResultFields {
        ResultFields {
            nome: "MARIA".to_string(),
            data_nascimento: "01/01/1990".to_string(),
            data_admissao: "02/02/2020".to_string(),
            valor_liberado: "3500.5".to_string(),
            margem: "700".to_string(),
            elegivel: "SIM".to_string(),
            status: STATUS_AUTHORIZED.to_string(),
            mensagem: "ok".to_string(),
        }
    }

    #[test]
    fn test_render_fixed_key_order() {
        assert_eq!(
            authorized_fields().render(),
            "Nome: MARIA, Data Nascimento: 01/01/1990, Data Admissao: 02/02/2020, \
             Valor Liberado: 3500.5, Margem: 700, Elegível: SIM, Status: Autorizado, Mensagem: ok"
        );
    }

    #[test]
    fn test_parse_recovers_rendered_fields() {
        let parsed = StoredResult::completed(authorized_fields()).status_fields();
        assert_eq!(parsed.nome, "MARIA");
        assert_eq!(parsed.elegivel, "SIM");
        assert_eq!(parsed.status, "Autorizado");
        assert_eq!(parsed.mensagem, "ok");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let mut result = StoredResult::reprocessing(1, 3, "connection refused");
        result.annotate(Annotation::Exception {
            message: "timeout: read".to_string(),
        });
        let text = result.render();
        assert_eq!(StatusFields::parse(&text), StatusFields::parse(&text));
    }

    #[test]
    fn test_later_keys_override_earlier() {
        let mut result = StoredResult::completed(ResultFields::not_authorized("Error: refused"));
        result.annotate(Annotation::AttemptsExhausted { attempts: 3 });

        let parsed = result.status_fields();
        assert_eq!(parsed.status, "Failed after 3 attempts");
        assert_eq!(parsed.mensagem, "backend offline or connection error");
    }

    #[test]
    fn test_pending_has_no_fields() {
        let parsed = StoredResult::pending().status_fields();
        assert_eq!(parsed.status, EMPTY_FIELD);
        assert_eq!(parsed.nome, EMPTY_FIELD);
        assert_eq!(StoredResult::pending().render(), "Pending");
    }

    #[test]
    fn test_annotation_on_empty_legacy_row() {
        let mut result = StoredResult::legacy("");
        result.annotate(Annotation::HttpError { status: 502 });
        assert_eq!(
            result.render(),
            ", Mensagem: HTTP error 502 during reprocessing"
        );
    }

    #[test]
    fn test_json_detail_keeps_annotation_order() {
        let mut result = StoredResult::reprocessing(1, 3, "refused");
        result.annotate(Annotation::HttpError { status: 500 });
        result.annotate(Annotation::AttemptsExhausted { attempts: 3 });

        let json = serde_json::to_string(&result).unwrap();
        let back: StoredResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.annotations.len(), 2);
        assert_eq!(back.render(), result.render());
    }
}
