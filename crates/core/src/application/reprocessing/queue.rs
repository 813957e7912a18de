// Retry queue (unbounded FIFO, many producers, one consumer) and attempt ledger

use crate::domain::{Identifier, RetryTicket, TicketState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Producer handle; cheap to clone
#[derive(Clone)]
pub struct RetryQueue {
    tx: mpsc::UnboundedSender<RetryTicket>,
    outstanding: Arc<AtomicUsize>,
}

impl RetryQueue {
    /// Push a ticket to the back of the queue
    pub fn enqueue(&self, ticket: RetryTicket) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        debug!(
            identifier = %ticket.identifier,
            batch_id = %ticket.batch_id,
            state = %TicketState::Queued,
            "Ticket enqueued"
        );
        if let Err(mpsc::error::SendError(ticket)) = self.tx.send(ticket) {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            warn!(
                identifier = %ticket.identifier,
                batch_id = %ticket.batch_id,
                "Reprocessing engine is gone, ticket dropped"
            );
        }
    }

    /// Tickets queued or in flight
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

/// Consumer side, owned by the engine
pub struct RetryReceiver {
    rx: mpsc::UnboundedReceiver<RetryTicket>,
    outstanding: Arc<AtomicUsize>,
}

impl RetryReceiver {
    /// Wait for the next ticket
    pub async fn recv(&mut self) -> Option<RetryTicket> {
        self.rx.recv().await
    }

    /// Next ticket if one is queued right now
    pub fn try_recv(&mut self) -> Option<RetryTicket> {
        self.rx.try_recv().ok()
    }

    /// Mark a dequeued ticket as fully handled
    pub fn complete(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Create a retry queue
pub fn retry_channel() -> (RetryQueue, RetryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let outstanding = Arc::new(AtomicUsize::new(0));
    (
        RetryQueue {
            tx,
            outstanding: Arc::clone(&outstanding),
        },
        RetryReceiver { rx, outstanding },
    )
}

/// Attempts per identifier; only ever grows for the life of the process
#[derive(Default)]
pub struct AttemptLedger {
    counts: Mutex<HashMap<String, u32>>,
}

impl AttemptLedger {
    /// Increment and return the new count
    pub fn record_attempt(&self, identifier: &Identifier) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        let count = counts.entry(identifier.as_str().to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn attempts(&self, identifier: &Identifier) -> u32 {
        self.counts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(identifier.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchId;

    fn ticket(id: &str) -> RetryTicket {
        RetryTicket::new(Identifier::parse(id).unwrap(), BatchId::parse("L1").unwrap())
    }

    #[tokio::test]
    async fn test_fifo_order_and_outstanding() {
        let (queue, mut rx) = retry_channel();
        queue.enqueue(ticket("1"));
        queue.enqueue(ticket("2"));
        assert_eq!(queue.outstanding(), 2);

        assert_eq!(rx.recv().await.unwrap().identifier.as_str(), "1");
        rx.complete();
        assert_eq!(queue.outstanding(), 1);
        assert_eq!(rx.try_recv().unwrap().identifier.as_str(), "2");
        rx.complete();
        assert_eq!(queue.outstanding(), 0);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_enqueue_after_consumer_dropped() {
        let (queue, rx) = retry_channel();
        drop(rx);
        queue.enqueue(ticket("1"));
        assert_eq!(queue.outstanding(), 0);
    }

    #[test]
    fn test_ledger_counts_per_identifier() {
        let ledger = AttemptLedger::default();
        let a = Identifier::parse("a").unwrap();
        let b = Identifier::parse("b").unwrap();

        assert_eq!(ledger.record_attempt(&a), 1);
        assert_eq!(ledger.record_attempt(&a), 2);
        assert_eq!(ledger.record_attempt(&b), 1);
        assert_eq!(ledger.attempts(&a), 2);
    }
}
