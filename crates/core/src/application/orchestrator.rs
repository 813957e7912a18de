// Batch Orchestrator - registers a batch and sweeps it once

use crate::application::query_executor::{LookupMode, QueryExecutor};
use crate::application::reprocessing::RetryQueue;
use crate::domain::{BatchId, Identifier, Outcome, RetryTicket, StoredResult};
use crate::error::{AppError, Result};
use crate::port::ResultStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative halt flag checked between identifiers of a sweep
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn halt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Result of registering a batch
#[derive(Debug, Clone, Serialize)]
pub struct RegisterSummary {
    pub batch_id: BatchId,
    pub submitted: usize,
    /// Rows that did not exist yet
    pub inserted: u64,
}

/// What the sweep decided for one identifier
#[derive(Debug, Clone)]
pub struct ProcessedIdentifier {
    pub identifier: Identifier,
    pub outcome: Outcome,
    pub result: StoredResult,
}

pub struct BatchOrchestrator {
    store: Arc<dyn ResultStore>,
    executor: Arc<QueryExecutor>,
    retry_queue: RetryQueue,
    stop: StopSignal,
    max_attempts: u32,
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<dyn ResultStore>,
        executor: Arc<QueryExecutor>,
        retry_queue: RetryQueue,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            executor,
            retry_queue,
            stop: StopSignal::default(),
            max_attempts,
        }
    }

    /// Handle used to interrupt a running sweep
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Insert a pending row for every identifier not yet in the batch
    pub async fn register(
        &self,
        identifiers: &[Identifier],
        batch_id: &BatchId,
    ) -> Result<RegisterSummary> {
        register_batch(self.store.as_ref(), identifiers, batch_id).await
    }

    /// Register the batch, then look up each identifier once in input order.
    ///
    /// Connection failures are handed to the reprocessing engine; every
    /// other outcome is final for the sweep. The halt flag is cleared when
    /// the sweep returns.
    pub async fn process(
        &self,
        identifiers: &[Identifier],
        batch_id: &BatchId,
    ) -> Result<Vec<ProcessedIdentifier>> {
        let result = self.sweep(identifiers, batch_id).await;
        self.stop.clear();
        result
    }

    async fn sweep(
        &self,
        identifiers: &[Identifier],
        batch_id: &BatchId,
    ) -> Result<Vec<ProcessedIdentifier>> {
        self.register(identifiers, batch_id).await?;

        let mut processed = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if self.stop.is_halted() {
                warn!(
                    batch_id = %batch_id,
                    processed = processed.len(),
                    remaining = identifiers.len() - processed.len(),
                    "Sweep halted"
                );
                break;
            }

            let outcome = self.executor.execute(identifier, LookupMode::Sweep).await;
            let result = match &outcome {
                Outcome::ConnectionError { message } => {
                    self.retry_queue
                        .enqueue(RetryTicket::new(identifier.clone(), batch_id.clone()));
                    StoredResult::reprocessing(1, self.max_attempts, message.clone())
                }
                other => StoredResult::completed(other.to_fields()),
            };

            self.store.upsert(identifier, batch_id, &result).await?;

            info!(
                identifier = %identifier,
                batch_id = %batch_id,
                outcome = outcome.kind(),
                "Identifier processed"
            );
            processed.push(ProcessedIdentifier {
                identifier: identifier.clone(),
                outcome,
                result,
            });
        }

        info!(
            batch_id = %batch_id,
            processed = processed.len(),
            "Sweep finished"
        );
        Ok(processed)
    }
}

/// Registration without a lookup pipeline (store only)
pub async fn register_batch(
    store: &dyn ResultStore,
    identifiers: &[Identifier],
    batch_id: &BatchId,
) -> Result<RegisterSummary> {
    validate(identifiers)?;
    let inserted = store.register_pending(batch_id, identifiers).await?;

    info!(
        batch_id = %batch_id,
        submitted = identifiers.len(),
        inserted = inserted,
        "Batch registered"
    );

    Ok(RegisterSummary {
        batch_id: batch_id.clone(),
        submitted: identifiers.len(),
        inserted,
    })
}

fn validate(identifiers: &[Identifier]) -> Result<()> {
    if identifiers.is_empty() {
        return Err(AppError::Validation("identifier list is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reprocessing::{retry_channel, RetryReceiver};
    use crate::application::token_manager::TokenManager;
    use crate::port::lookup_client::mocks::{replies, Reply, ScriptedLookupClient};
    use crate::port::result_store::mocks::InMemoryResultStore;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::token_issuer::mocks::SequentialTokenIssuer;

    struct Harness {
        orchestrator: BatchOrchestrator,
        store: Arc<InMemoryResultStore>,
        client: Arc<ScriptedLookupClient>,
        queue: RetryQueue,
        _receiver: RetryReceiver,
    }

    fn harness(fallback: Reply) -> Harness {
        let store = Arc::new(InMemoryResultStore::new());
        let client = Arc::new(ScriptedLookupClient::new(fallback));
        let tokens = Arc::new(TokenManager::new(
            Arc::new(SequentialTokenIssuer::new()),
            Arc::new(SystemTimeProvider),
        ));
        let executor = Arc::new(QueryExecutor::new(client.clone(), tokens));
        let (queue, receiver) = retry_channel();
        let orchestrator = BatchOrchestrator::new(store.clone(), executor, queue.clone(), 3);
        Harness {
            orchestrator,
            store,
            client,
            queue,
            _receiver: receiver,
        }
    }

    fn ids(raw: &[&str]) -> Vec<Identifier> {
        Identifier::parse_all(raw.iter().copied()).unwrap()
    }

    fn batch(raw: &str) -> BatchId {
        BatchId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let h = harness(replies::empty(""));
        let first = h
            .orchestrator
            .register(&ids(&["1", "2"]), &batch("L1"))
            .await
            .unwrap();
        let second = h
            .orchestrator
            .register(&ids(&["1", "2", "3"]), &batch("L1"))
            .await
            .unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 1);
        assert_eq!(h.store.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_list() {
        let h = harness(replies::empty(""));
        let err = h.orchestrator.register(&[], &batch("L1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_found_result_is_stored() {
        let h = harness(replies::found("MARIA", "SIM", "ok"));
        let processed = h
            .orchestrator
            .process(&ids(&["11111111111"]), &batch("L1"))
            .await
            .unwrap();

        assert_eq!(processed.len(), 1);
        let fields = h.store.rows()[0].result.status_fields();
        assert_eq!(fields.status, "Autorizado");
        assert_eq!(fields.elegivel, "SIM");
        assert_eq!(fields.nome, "MARIA");
        assert_eq!(h.queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_connection_error_enqueues_ticket() {
        let h = harness(replies::connection_refused());
        let processed = h
            .orchestrator
            .process(&ids(&["1"]), &batch("L1"))
            .await
            .unwrap();

        assert!(processed[0].outcome.is_retryable());
        let text = h.store.rendered("1", "L1").unwrap();
        assert!(text.starts_with("Status: Reprocessing (1/3), Mensagem: "));
        assert_eq!(h.queue.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_final_for_sweep() {
        let h = harness(replies::http(500));
        let processed = h
            .orchestrator
            .process(&ids(&["1"]), &batch("L1"))
            .await
            .unwrap();

        assert!(!processed[0].outcome.is_retryable());

        let fields = h.store.rows()[0].result.status_fields();
        assert_eq!(fields.status, "Não autorizado");
        assert_eq!(fields.mensagem, "HTTP error 500");
        assert_eq!(h.queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_missing_erro_flag_is_stored_as_rejection() {
        let h = harness(replies::found_flagged("ANA", "SIM", "consulta falhou", None));
        h.orchestrator
            .process(&ids(&["1"]), &batch("L1"))
            .await
            .unwrap();

        let fields = h.store.rows()[0].result.status_fields();
        assert_eq!(fields.status, "Não autorizado");
        assert_eq!(fields.mensagem, "consulta falhou");
        assert_eq!(fields.nome, "-");
        assert_eq!(h.queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_halt_skips_remaining_and_clears() {
        let h = harness(replies::found("ANA", "NAO", "ok"));
        let stop = h.orchestrator.stop_signal();
        stop.halt();

        let processed = h
            .orchestrator
            .process(&ids(&["1", "2"]), &batch("L1"))
            .await
            .unwrap();

        assert!(processed.is_empty());
        assert_eq!(h.client.call_count(), 0);
        // Rows stay registered as pending
        assert!(h.store.rows().iter().all(|r| r.result.is_pending()));
        assert!(!stop.is_halted());
    }

    #[tokio::test]
    async fn test_input_order_is_preserved() {
        let h = harness(replies::found("ANA", "SIM", "ok"));
        h.orchestrator
            .process(&ids(&["3", "1", "2"]), &batch("L1"))
            .await
            .unwrap();

        let order: Vec<String> = h.client.calls().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["3", "1", "2"]);
    }
}
