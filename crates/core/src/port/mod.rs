// Port Layer - Interfaces for external dependencies

pub mod lookup_client;
pub mod result_store;
pub mod time_provider; // For deterministic testing
pub mod token_issuer;

// Re-exports
pub use lookup_client::{
    LookupClient, LookupError, LookupPayload, LookupResponse, WorkerDataEnvelope, WorkerRecord,
};
pub use result_store::{ResultStore, UpsertOutcome};
pub use time_provider::TimeProvider;
pub use token_issuer::{AuthError, TokenIssuer};
