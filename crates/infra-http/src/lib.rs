// Eligibility Infrastructure - HTTP Adapters
// Implements: TokenIssuer, LookupClient

mod config;
mod lookup_client;
mod token_issuer;

pub use config::{ApiConfig, DEFAULT_LOOKUP_URL, DEFAULT_TOKEN_URL};
pub use lookup_client::HttpLookupClient;
pub use token_issuer::HttpTokenIssuer;
