// Application Layer - Use Cases and Business Logic

pub mod batch_status;
pub mod orchestrator;
pub mod query_executor;
pub mod reprocessing;
pub mod shutdown;
pub mod token_manager;

// Re-exports
pub use batch_status::{batch_status, BatchStatus, BatchStatusRow};
pub use orchestrator::{
    register_batch, BatchOrchestrator, ProcessedIdentifier, RegisterSummary, StopSignal,
};
pub use query_executor::{LookupMode, QueryExecutor};
pub use reprocessing::{retry_channel, ReprocessingConfig, ReprocessingEngine, RetryQueue};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use token_manager::TokenManager;
