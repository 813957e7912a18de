// Reprocessing Engine - background retry of failed lookups

pub mod constants;
mod queue;

use constants::*;
pub use queue::{retry_channel, AttemptLedger, RetryQueue, RetryReceiver};

use crate::application::query_executor::{LookupMode, QueryExecutor};
use crate::application::shutdown::ShutdownToken;
use crate::domain::{Annotation, Outcome, RetryTicket, StoredResult, TicketState};
use crate::error::{AppError, Result};
use crate::port::ResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Engine tunables
#[derive(Debug, Clone)]
pub struct ReprocessingConfig {
    pub max_attempts: u32,
    /// Pause after each handled ticket
    pub pacing: Duration,
    /// Pause after a loop-level error
    pub error_pause: Duration,
}

impl Default for ReprocessingConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            pacing: PACING_DELAY,
            error_pause: ERROR_RECOVERY_PAUSE,
        }
    }
}

/// Single-consumer retry loop.
///
/// Dequeues one ticket at a time, bumps the identifier's attempt counter and
/// either records a terminal failure (counter above the ceiling) or retries
/// the lookup and merges the result into the store.
pub struct ReprocessingEngine {
    handler: Arc<TicketHandler>,
    receiver: Mutex<RetryReceiver>,
    config: ReprocessingConfig,
}

impl ReprocessingEngine {
    /// Create an engine and the queue handle producers push tickets into
    pub fn new(
        store: Arc<dyn ResultStore>,
        executor: Arc<QueryExecutor>,
        config: ReprocessingConfig,
    ) -> (Self, RetryQueue) {
        let (queue, receiver) = retry_channel();
        let handler = Arc::new(TicketHandler {
            store,
            executor,
            queue: queue.clone(),
            ledger: AttemptLedger::default(),
            max_attempts: config.max_attempts,
        });
        let engine = Self {
            handler,
            receiver: Mutex::new(receiver),
            config,
        };
        (engine, queue)
    }

    /// Attempts consumed so far by `identifier`
    pub fn attempts(&self, identifier: &crate::domain::Identifier) -> u32 {
        self.handler.ledger.attempts(identifier)
    }

    /// Run the loop until shutdown. Never returns on ticket errors.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            max_attempts = self.config.max_attempts,
            pacing_ms = self.config.pacing.as_millis() as u64,
            "Reprocessing engine started"
        );
        let mut receiver = self.receiver.lock().await;

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let ticket = tokio::select! {
                ticket = receiver.recv() => match ticket {
                    Some(t) => t,
                    None => break,
                },
                _ = shutdown.wait() => break,
            };

            let pause = match self.dispatch(ticket).await {
                Ok(_) => self.config.pacing,
                Err(e) => {
                    error!(error = %e, "Reprocessing loop error");
                    self.config.error_pause
                }
            };
            receiver.complete();

            tokio::select! {
                _ = sleep(pause) => {},
                _ = shutdown.wait() => break,
            }
        }

        info!("Reprocessing engine stopped");
    }

    /// Handle the next queued ticket immediately, without pacing.
    ///
    /// Returns `None` when the queue is empty.
    pub async fn process_next(&self) -> Option<Result<TicketState>> {
        let mut receiver = self.receiver.lock().await;
        let ticket = receiver.try_recv()?;
        let result = self.dispatch(ticket).await;
        receiver.complete();
        Some(result)
    }

    /// Handle a ticket on its own task so a panic cannot end the loop.
    /// Tickets whose handling failed go back on the queue.
    async fn dispatch(&self, ticket: RetryTicket) -> Result<TicketState> {
        let handler = Arc::clone(&self.handler);
        let task_ticket = ticket.clone();

        let result = match tokio::spawn(async move { handler.handle(task_ticket).await }).await {
            Ok(result) => result,
            Err(join_err) => Err(AppError::Internal(format!(
                "ticket handler aborted: {}",
                join_err
            ))),
        };

        if let Err(e) = &result {
            warn!(
                identifier = %ticket.identifier,
                batch_id = %ticket.batch_id,
                error = %e,
                "Ticket handling failed, requeuing"
            );
            self.handler.queue.enqueue(ticket);
        }
        result
    }
}

/// Per-ticket state machine; shared with spawned tasks
struct TicketHandler {
    store: Arc<dyn ResultStore>,
    executor: Arc<QueryExecutor>,
    queue: RetryQueue,
    ledger: AttemptLedger,
    max_attempts: u32,
}

impl TicketHandler {
    async fn handle(&self, ticket: RetryTicket) -> Result<TicketState> {
        let attempt = self.ledger.record_attempt(&ticket.identifier);

        if attempt > self.max_attempts {
            warn!(
                identifier = %ticket.identifier,
                batch_id = %ticket.batch_id,
                max_attempts = self.max_attempts,
                "Attempt ceiling reached"
            );
            self.annotate(
                &ticket,
                Annotation::AttemptsExhausted {
                    attempts: self.max_attempts,
                },
            )
            .await?;
            return Ok(self.finish(&ticket, TicketState::TerminallyFailed));
        }

        info!(
            identifier = %ticket.identifier,
            batch_id = %ticket.batch_id,
            attempt = attempt,
            max_attempts = self.max_attempts,
            state = %TicketState::InFlight,
            "Reprocessing identifier"
        );

        let state = match self
            .executor
            .execute(&ticket.identifier, LookupMode::Reprocessing)
            .await
        {
            Outcome::Found(fields) => {
                self.store
                    .upsert(
                        &ticket.identifier,
                        &ticket.batch_id,
                        &StoredResult::completed(fields),
                    )
                    .await?;
                TicketState::Resolved
            }
            Outcome::NoData { .. } | Outcome::Rejected { .. } | Outcome::AuthRejected { .. } => {
                self.queue.enqueue(ticket.clone());
                TicketState::RequeuedAfterEmpty
            }
            Outcome::HttpError { status } => {
                self.annotate(&ticket, Annotation::HttpError { status })
                    .await?;
                self.queue.enqueue(ticket.clone());
                TicketState::RequeuedAfterHttpError
            }
            Outcome::ConnectionError { message } | Outcome::Failed { message } => {
                self.annotate(&ticket, Annotation::Exception { message })
                    .await?;
                self.queue.enqueue(ticket.clone());
                TicketState::RequeuedAfterException
            }
        };

        Ok(self.finish(&ticket, state))
    }

    /// Append an annotation to the stored result (read, extend, rewrite)
    async fn annotate(&self, ticket: &RetryTicket, annotation: Annotation) -> Result<()> {
        let mut result = self
            .store
            .find(&ticket.identifier, &ticket.batch_id)
            .await?
            .map(|record| record.result)
            .unwrap_or_else(|| StoredResult::legacy(""));
        result.annotate(annotation);
        self.store
            .upsert(&ticket.identifier, &ticket.batch_id, &result)
            .await?;
        Ok(())
    }

    fn finish(&self, ticket: &RetryTicket, state: TicketState) -> TicketState {
        info!(
            identifier = %ticket.identifier,
            batch_id = %ticket.batch_id,
            state = %state,
            "Ticket handled"
        );
        state
    }
}
