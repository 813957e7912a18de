// Central Error Type for the Application

use crate::port::{AuthError, LookupError};
use thiserror::Error;

/// Application-level error type
///
/// Per-identifier lookup failures are never surfaced through this type by the
/// orchestrator; they are captured as stored results. `AppError` covers
/// structural failures (bad request, store unavailable, token issuance).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions are handled in the infra
// crates (orphan rules), by mapping to AppError::Database / LookupError.
