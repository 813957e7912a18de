// Eligibility Infrastructure - SQLite Adapter
// Implements: ResultStore

mod connection;
mod error;
mod migration;
mod result_store;

pub use connection::{create_pool, database_url};
pub use migration::run_migrations;
pub use result_store::SqliteResultStore;
