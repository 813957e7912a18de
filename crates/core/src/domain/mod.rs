// Domain Layer - Pure business logic and entities

pub mod credential;
pub mod error;
pub mod identifier;
pub mod outcome;
pub mod record;
pub mod ticket;

// Re-exports
pub use credential::Credential;
pub use error::DomainError;
pub use identifier::{pad_identifier, BatchId, Identifier, IDENTIFIER_WIDTH};
pub use outcome::{eligibility_status, Outcome};
pub use record::{
    Annotation, QueryRecord, ResultBody, ResultFields, StatusFields, StoredResult, EMPTY_FIELD,
    STATUS_AUTHORIZED, STATUS_NOT_AUTHORIZED, STATUS_PENDING,
};
pub use ticket::{RetryTicket, TicketState};
