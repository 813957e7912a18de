// Result Store Port (Interface)

use crate::domain::{BatchId, Identifier, QueryRecord, StoredResult};
use crate::error::Result;
use async_trait::async_trait;

/// Which path an upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A row for (identifier, batch) existed and was overwritten
    Updated,
    /// No row matched; a new one was inserted
    Inserted,
}

/// Durable per-(identifier, batch) result storage
///
/// Every call is its own connection-scoped transaction; nothing spans
/// multiple identifiers except `register_pending`.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a "Pending" row for each identifier not yet registered in the
    /// batch. Existing rows are left untouched.
    ///
    /// # Returns
    /// Number of rows actually inserted
    async fn register_pending(&self, batch_id: &BatchId, identifiers: &[Identifier]) -> Result<u64>;

    /// Current row for (identifier, batch)
    async fn find(&self, identifier: &Identifier, batch_id: &BatchId)
        -> Result<Option<QueryRecord>>;

    /// Overwrite the row for (identifier, batch), inserting it if absent
    async fn upsert(
        &self,
        identifier: &Identifier,
        batch_id: &BatchId,
        result: &StoredResult,
    ) -> Result<UpsertOutcome>;

    /// Latest row (max sequence) per identifier in a batch, oldest first
    async fn latest_per_identifier(&self, batch_id: &BatchId) -> Result<Vec<QueryRecord>>;

    /// Batch of the most recently written row that has one
    async fn latest_batch_id(&self) -> Result<Option<BatchId>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store with the same uniqueness and sequencing rules
    #[derive(Default)]
    pub struct InMemoryResultStore {
        rows: Mutex<Vec<QueryRecord>>,
        writes: Mutex<usize>,
    }

    impl InMemoryResultStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rows(&self) -> Vec<QueryRecord> {
            self.rows.lock().unwrap().clone()
        }

        /// Number of upserts performed
        pub fn write_count(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        pub fn rendered(&self, identifier: &str, batch_id: &str) -> Option<String> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| r.identifier == identifier && r.batch_id.as_deref() == Some(batch_id))
                .map(|r| r.result.render())
        }

        fn next_id(rows: &[QueryRecord]) -> i64 {
            rows.iter().map(|r| r.id).max().unwrap_or(0) + 1
        }
    }

    #[async_trait]
    impl ResultStore for InMemoryResultStore {
        async fn register_pending(
            &self,
            batch_id: &BatchId,
            identifiers: &[Identifier],
        ) -> Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut inserted = 0;
            for identifier in identifiers {
                let exists = rows.iter().any(|r| {
                    r.identifier == identifier.as_str()
                        && r.batch_id.as_deref() == Some(batch_id.as_str())
                });
                if !exists {
                    let id = Self::next_id(&rows);
                    rows.push(QueryRecord {
                        id,
                        identifier: identifier.as_str().to_string(),
                        result: StoredResult::pending(),
                        timestamp: String::new(),
                        batch_id: Some(batch_id.as_str().to_string()),
                    });
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn find(
            &self,
            identifier: &Identifier,
            batch_id: &BatchId,
        ) -> Result<Option<QueryRecord>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| {
                    r.identifier == identifier.as_str()
                        && r.batch_id.as_deref() == Some(batch_id.as_str())
                })
                .cloned())
        }

        async fn upsert(
            &self,
            identifier: &Identifier,
            batch_id: &BatchId,
            result: &StoredResult,
        ) -> Result<UpsertOutcome> {
            *self.writes.lock().unwrap() += 1;
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| {
                r.identifier == identifier.as_str()
                    && r.batch_id.as_deref() == Some(batch_id.as_str())
            }) {
                row.result = result.clone();
                return Ok(UpsertOutcome::Updated);
            }
            let id = Self::next_id(&rows);
            rows.push(QueryRecord {
                id,
                identifier: identifier.as_str().to_string(),
                result: result.clone(),
                timestamp: String::new(),
                batch_id: Some(batch_id.as_str().to_string()),
            });
            Ok(UpsertOutcome::Inserted)
        }

        async fn latest_per_identifier(&self, batch_id: &BatchId) -> Result<Vec<QueryRecord>> {
            let rows = self.rows.lock().unwrap();
            let mut latest: Vec<QueryRecord> = Vec::new();
            for row in rows
                .iter()
                .filter(|r| r.batch_id.as_deref() == Some(batch_id.as_str()))
            {
                match latest.iter_mut().find(|l| l.identifier == row.identifier) {
                    Some(existing) if existing.id < row.id => *existing = row.clone(),
                    Some(_) => {}
                    None => latest.push(row.clone()),
                }
            }
            latest.sort_by_key(|r| r.id);
            Ok(latest)
        }

        async fn latest_batch_id(&self) -> Result<Option<BatchId>> {
            let rows = self.rows.lock().unwrap();
            let batch = rows
                .iter()
                .filter_map(|r| r.batch_id.clone().map(|b| (r.id, b)))
                .max_by_key(|(id, _)| *id)
                .map(|(_, b)| b);
            match batch {
                Some(b) => Ok(Some(BatchId::parse(b)?)),
                None => Ok(None),
            }
        }
    }
}
