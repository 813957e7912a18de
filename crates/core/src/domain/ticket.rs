// Retry ticket & its state machine

use crate::domain::identifier::{BatchId, Identifier};
use serde::{Deserialize, Serialize};

/// Queued retry request for one identifier within one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryTicket {
    pub identifier: Identifier,
    pub batch_id: BatchId,
}

impl RetryTicket {
    pub fn new(identifier: Identifier, batch_id: BatchId) -> Self {
        Self {
            identifier,
            batch_id,
        }
    }
}

/// Ticket lifecycle inside the reprocessing engine
///
/// Queued -> InFlight -> { Resolved, RequeuedAfterEmpty, RequeuedAfterHttpError,
///                         RequeuedAfterException, TerminallyFailed }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    Queued,
    InFlight,
    Resolved,
    RequeuedAfterEmpty,
    RequeuedAfterHttpError,
    RequeuedAfterException,
    TerminallyFailed,
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketState::Queued => write!(f, "QUEUED"),
            TicketState::InFlight => write!(f, "IN_FLIGHT"),
            TicketState::Resolved => write!(f, "RESOLVED"),
            TicketState::RequeuedAfterEmpty => write!(f, "REQUEUED_AFTER_EMPTY"),
            TicketState::RequeuedAfterHttpError => write!(f, "REQUEUED_AFTER_HTTP_ERROR"),
            TicketState::RequeuedAfterException => write!(f, "REQUEUED_AFTER_EXCEPTION"),
            TicketState::TerminallyFailed => write!(f, "TERMINALLY_FAILED"),
        }
    }
}
