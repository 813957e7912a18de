// Lookup outcome classification result

use crate::domain::record::{ResultFields, STATUS_AUTHORIZED, STATUS_NOT_AUTHORIZED};

/// Literal eligibility flag returned by the API for eligible workers
const ELIGIBLE_FLAG: &str = "SIM";

/// Substring (case-insensitive) of the API message that also grants authorization
const AUTHORIZED_MARKER: &str = "autorizado";

/// Structured result of one lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// HTTP 200 with at least one worker-data record
    Found(ResultFields),
    /// HTTP 200, no worker-data records
    NoData { message: String },
    /// HTTP 200 flagged as an error by the API (business rejection)
    Rejected { message: String },
    /// API reported the bearer token as invalid
    AuthRejected { message: String },
    /// Any non-200 status
    HttpError { status: u16 },
    /// Transport failure; routed to the reprocessing engine
    ConnectionError { message: String },
    /// Non-retryable failure (undecodable body, token issuance failure)
    Failed { message: String },
}

impl Outcome {
    /// Sweep outcomes handed to the reprocessing engine instead of being stored as final
    pub fn is_retryable(&self) -> bool {
        matches!(self, Outcome::ConnectionError { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Found(_) => "found",
            Outcome::NoData { .. } => "no_data",
            Outcome::Rejected { .. } => "rejected",
            Outcome::AuthRejected { .. } => "auth_rejected",
            Outcome::HttpError { .. } => "http_error",
            Outcome::ConnectionError { .. } => "connection_error",
            Outcome::Failed { .. } => "failed",
        }
    }

    /// Fields recorded when this outcome is final for a sweep
    pub fn to_fields(&self) -> ResultFields {
        match self {
            Outcome::Found(fields) => fields.clone(),
            Outcome::NoData { message } if message.is_empty() => {
                ResultFields::not_authorized("No data returned")
            }
            Outcome::NoData { message }
            | Outcome::Rejected { message }
            | Outcome::AuthRejected { message } => ResultFields::not_authorized(message.clone()),
            Outcome::HttpError { status } => {
                ResultFields::not_authorized(format!("HTTP error {}", status))
            }
            Outcome::ConnectionError { message } | Outcome::Failed { message } => {
                ResultFields::not_authorized(format!("Error: {}", message))
            }
        }
    }
}

/// Authorization rule: eligible flag is exactly "SIM", or the API message
/// contains "autorizado" in any case.
pub fn eligibility_status(elegivel: Option<&str>, message: &str) -> &'static str {
    if elegivel == Some(ELIGIBLE_FLAG) || message.to_lowercase().contains(AUTHORIZED_MARKER) {
        STATUS_AUTHORIZED
    } else {
        STATUS_NOT_AUTHORIZED
    }
}
