//! Eligibility CLI - register CPF batches, sweep them against the lookup API
//! and inspect stored results

mod input;
mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use eligibility_core::application::reprocessing::constants::{
    ERROR_RECOVERY_PAUSE, MAX_ATTEMPTS, PACING_DELAY,
};
use eligibility_core::application::{
    batch_status, register_batch, shutdown_channel, BatchOrchestrator, QueryExecutor,
    ReprocessingConfig, ReprocessingEngine, TokenManager,
};
use eligibility_core::domain::BatchId;
use eligibility_core::port::time_provider::SystemTimeProvider;
use eligibility_core::port::{ResultStore, TimeProvider};
use eligibility_infra_http::{
    ApiConfig, HttpLookupClient, HttpTokenIssuer, DEFAULT_LOOKUP_URL, DEFAULT_TOKEN_URL,
};
use eligibility_infra_sqlite::{create_pool, database_url, run_migrations, SqliteResultStore};

const DEFAULT_DB_PATH: &str = "~/.eligibility/consultas.db";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "eligibility")]
#[command(about = "CPF batch eligibility checker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, global = true, env = "ELIGIBILITY_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register identifiers as pending in a batch
    Register {
        #[command(flatten)]
        batch: BatchInput,
    },

    /// Register and sweep a batch, then wait for background retries
    Run {
        #[command(flatten)]
        batch: BatchInput,

        #[command(flatten)]
        api: ApiArgs,

        /// Retry attempts per identifier before giving up
        #[arg(long, env = "ELIGIBILITY_MAX_ATTEMPTS", default_value_t = MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Seconds between background retries
        #[arg(long, env = "ELIGIBILITY_PACING_SECS", default_value_t = PACING_DELAY.as_secs())]
        pacing_secs: u64,

        /// Seconds to pause after a retry loop error
        #[arg(long, env = "ELIGIBILITY_ERROR_PAUSE_SECS", default_value_t = ERROR_RECOVERY_PAUSE.as_secs())]
        error_pause_secs: u64,
    },

    /// Show the latest result per identifier of a batch
    Status {
        /// Batch id (defaults to the most recent batch)
        #[arg(short, long)]
        batch: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct BatchInput {
    /// Batch id
    #[arg(short, long)]
    batch: String,

    /// Identifiers (CPFs)
    cpfs: Vec<String>,

    /// File with one identifier per line
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl BatchInput {
    async fn resolve(&self) -> Result<(BatchId, Vec<eligibility_core::domain::Identifier>)> {
        let batch_id = BatchId::parse(self.batch.clone()).context("Invalid batch id")?;
        let identifiers = input::load_identifiers(&self.cpfs, self.file.as_deref()).await?;
        Ok((batch_id, identifiers))
    }
}

#[derive(Args)]
struct ApiArgs {
    /// Token endpoint
    #[arg(long, env = "ELIGIBILITY_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    token_url: String,

    /// Lookup endpoint
    #[arg(long, env = "ELIGIBILITY_LOOKUP_URL", default_value = DEFAULT_LOOKUP_URL)]
    lookup_url: String,

    /// Authorization header value for the token endpoint (e.g. "Basic ...")
    #[arg(long, env = "ELIGIBILITY_TOKEN_AUTH", hide_env_values = true)]
    token_auth: String,

    /// Token request timeout in seconds
    #[arg(long, env = "ELIGIBILITY_TOKEN_TIMEOUT_SECS", default_value_t = 10)]
    token_timeout_secs: u64,

    /// Lookup request timeout in seconds
    #[arg(long, env = "ELIGIBILITY_LOOKUP_TIMEOUT_SECS", default_value_t = 15)]
    lookup_timeout_secs: u64,
}

impl ApiArgs {
    fn to_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(self.token_auth.clone());
        config.token_url = self.token_url.clone();
        config.lookup_url = self.lookup_url.clone();
        config.token_timeout = Duration::from_secs(self.token_timeout_secs);
        config.lookup_timeout = Duration::from_secs(self.lookup_timeout_secs);
        config
    }
}

/// Open (and migrate) the result store
async fn open_store(db_path: &str, time_provider: Arc<dyn TimeProvider>) -> Result<Arc<SqliteResultStore>> {
    let path = PathBuf::from(shellexpand::tilde(db_path).into_owned());
    info!(db_path = %path.display(), "Initializing database...");

    let url = database_url(&path)?;
    let pool = create_pool(&url).await.context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    Ok(Arc::new(SqliteResultStore::new(pool, time_provider)))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store = open_store(&cli.db_path, time_provider.clone()).await?;

    match cli.command {
        Commands::Register { batch } => {
            let (batch_id, identifiers) = batch.resolve().await?;
            let summary = register_batch(&*store, &identifiers, &batch_id).await?;
            output::print_registered(&summary);
        }

        Commands::Run {
            batch,
            api,
            max_attempts,
            pacing_secs,
            error_pause_secs,
        } => {
            let (batch_id, identifiers) = batch.resolve().await?;
            let config = ReprocessingConfig {
                max_attempts,
                pacing: Duration::from_secs(pacing_secs),
                error_pause: Duration::from_secs(error_pause_secs),
            };
            run_batch(store, time_provider, api.to_config(), config, batch_id, identifiers).await?;
        }

        Commands::Status { batch, json } => {
            let batch_id = batch
                .map(BatchId::parse)
                .transpose()
                .context("Invalid batch id")?;
            let status = batch_status(&*store, batch_id.as_ref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                output::print_status(&status);
            }
        }
    }

    Ok(())
}

async fn run_batch(
    store: Arc<SqliteResultStore>,
    time_provider: Arc<dyn TimeProvider>,
    api: ApiConfig,
    config: ReprocessingConfig,
    batch_id: BatchId,
    identifiers: Vec<eligibility_core::domain::Identifier>,
) -> Result<()> {
    info!("Eligibility v{} starting...", eligibility_core::VERSION);

    // DI wiring
    let issuer = Arc::new(HttpTokenIssuer::new(&api)?);
    let client = Arc::new(HttpLookupClient::new(&api)?);
    let tokens = Arc::new(TokenManager::new(issuer, time_provider));
    let executor = Arc::new(QueryExecutor::new(client, tokens));
    let store: Arc<dyn ResultStore> = store;

    let max_attempts = config.max_attempts;
    let (engine, retry_queue) = ReprocessingEngine::new(store.clone(), executor.clone(), config);
    let engine = Arc::new(engine);
    let orchestrator = BatchOrchestrator::new(store.clone(), executor, retry_queue.clone(), max_attempts);

    // Background reprocessing
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let shutdown_tx = Arc::new(shutdown_tx);
    let mut interrupted = shutdown_rx.clone();
    let engine_handle = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run(shutdown_rx).await })
    };

    // Ctrl+C halts the sweep and stops the engine
    {
        let stop = orchestrator.stop_signal();
        let shutdown_tx = Arc::clone(&shutdown_tx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping...");
                stop.halt();
                shutdown_tx.shutdown();
            }
        });
    }

    let processed = orchestrator.process(&identifiers, &batch_id).await?;
    output::print_sweep(&processed, identifiers.len());

    // Wait for the retry queue to drain
    let mut last_reported = usize::MAX;
    while !interrupted.is_shutdown() {
        let outstanding = retry_queue.outstanding();
        if outstanding == 0 {
            break;
        }
        if outstanding != last_reported {
            info!(outstanding, "Waiting for background reprocessing");
            last_reported = outstanding;
        }
        tokio::select! {
            _ = tokio::time::sleep(DRAIN_POLL) => {},
            _ = interrupted.wait() => break,
        }
    }

    let pending = retry_queue.outstanding();
    if pending > 0 {
        println!(
            "{}",
            format!("⚠ {} identifier(s) still awaiting reprocessing", pending).yellow()
        );
    }

    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, engine_handle).await.is_err() {
        warn!("Reprocessing engine did not stop in time");
    }

    let status = batch_status(&*store, Some(&batch_id)).await?;
    output::print_status(&status);

    info!("Shutdown complete.");
    Ok(())
}
