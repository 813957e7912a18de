// SQLite ResultStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use eligibility_core::domain::{BatchId, Identifier, QueryRecord, StoredResult};
use eligibility_core::error::Result;
use eligibility_core::port::{ResultStore, TimeProvider, UpsertOutcome};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SqliteResultStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn register_pending(&self, batch_id: &BatchId, identifiers: &[Identifier]) -> Result<u64> {
        let now = self.time_provider.now_timestamp();
        let pending = StoredResult::pending();
        let detail = serde_json::to_string(&pending)?;
        let rendered = pending.render();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut inserted = 0;
        for identifier in identifiers {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO consultas (cpf, resultado, data, lote_id, detalhe)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(identifier.as_str())
            .bind(&rendered)
            .bind(&now)
            .bind(batch_id.as_str())
            .bind(&detail)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            batch_id = %batch_id,
            submitted = identifiers.len(),
            inserted,
            "Pending rows registered"
        );
        Ok(inserted)
    }

    async fn find(
        &self,
        identifier: &Identifier,
        batch_id: &BatchId,
    ) -> Result<Option<QueryRecord>> {
        let row = sqlx::query_as::<_, ConsultaRow>(
            r#"
            SELECT id, cpf, resultado, data, lote_id, detalhe
            FROM consultas
            WHERE cpf = ? AND lote_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(identifier.as_str())
        .bind(batch_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ConsultaRow::into_record))
    }

    async fn upsert(
        &self,
        identifier: &Identifier,
        batch_id: &BatchId,
        result: &StoredResult,
    ) -> Result<UpsertOutcome> {
        let now = self.time_provider.now_timestamp();
        let detail = serde_json::to_string(result)?;
        let rendered = result.render();

        let updated = sqlx::query(
            r#"
            UPDATE consultas
            SET resultado = ?, data = ?, detalhe = ?
            WHERE cpf = ? AND lote_id = ?
            "#,
        )
        .bind(&rendered)
        .bind(&now)
        .bind(&detail)
        .bind(identifier.as_str())
        .bind(batch_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        // Row vanished or was never registered
        sqlx::query(
            r#"
            INSERT INTO consultas (cpf, resultado, data, lote_id, detalhe)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(cpf, lote_id) DO UPDATE SET
                resultado = excluded.resultado,
                data = excluded.data,
                detalhe = excluded.detalhe
            "#,
        )
        .bind(identifier.as_str())
        .bind(&rendered)
        .bind(&now)
        .bind(batch_id.as_str())
        .bind(&detail)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(UpsertOutcome::Inserted)
    }

    async fn latest_per_identifier(&self, batch_id: &BatchId) -> Result<Vec<QueryRecord>> {
        let rows = sqlx::query_as::<_, ConsultaRow>(
            r#"
            SELECT c.id, c.cpf, c.resultado, c.data, c.lote_id, c.detalhe
            FROM consultas c
            INNER JOIN (
                SELECT cpf, MAX(id) AS max_id
                FROM consultas
                WHERE lote_id = ?
                GROUP BY cpf
            ) latest ON c.id = latest.max_id
            ORDER BY c.id ASC
            "#,
        )
        .bind(batch_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ConsultaRow::into_record).collect())
    }

    async fn latest_batch_id(&self) -> Result<Option<BatchId>> {
        let batch: Option<String> = sqlx::query_scalar(
            r#"
            SELECT lote_id FROM consultas
            WHERE lote_id IS NOT NULL AND TRIM(lote_id) != ''
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match batch {
            Some(b) => Ok(Some(BatchId::parse(b)?)),
            None => Ok(None),
        }
    }
}

// Internal row mapping
#[derive(sqlx::FromRow)]
struct ConsultaRow {
    id: i64,
    cpf: String,
    resultado: String,
    data: String,
    lote_id: Option<String>,
    detalhe: Option<String>,
}

impl ConsultaRow {
    /// Prefer the typed detail; rows written by older tools only carry text
    fn into_record(self) -> QueryRecord {
        let result = match self.detalhe.as_deref() {
            Some(json) => match serde_json::from_str::<StoredResult>(json) {
                Ok(typed) => typed,
                Err(e) => {
                    warn!(id = self.id, error = %e, "Unreadable result detail, using stored text");
                    StoredResult::legacy(self.resultado.clone())
                }
            },
            None => StoredResult::legacy(self.resultado.clone()),
        };

        QueryRecord {
            id: self.id,
            identifier: self.cpf,
            result,
            timestamp: self.data,
            batch_id: self.lote_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use eligibility_core::domain::{Annotation, ResultFields};
    use eligibility_core::port::time_provider::mocks::ManualClock;

    async fn setup_test_db() -> SqliteResultStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        // 2024-01-15 12:00:00 UTC
        let clock = Arc::new(ManualClock::new(1_705_320_000_000));
        SqliteResultStore::new(pool, clock)
    }

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).unwrap()
    }

    fn batch(raw: &str) -> BatchId {
        BatchId::parse(raw).unwrap()
    }

    fn authorized() -> ResultFields {
        ResultFields {
            nome: "MARIA".to_string(),
            data_nascimento: "01/01/1990".to_string(),
            data_admissao: "10/03/2019".to_string(),
            valor_liberado: "4200.5".to_string(),
            margem: "840.10".to_string(),
            elegivel: "SIM".to_string(),
            status: "Autorizado".to_string(),
            mensagem: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_pending_is_idempotent() {
        let store = setup_test_db().await;
        let l1 = batch("L1");

        assert_eq!(store.register_pending(&l1, &[id("1"), id("2")]).await.unwrap(), 2);
        assert_eq!(store.register_pending(&l1, &[id("1"), id("2")]).await.unwrap(), 0);

        let rows = store.latest_per_identifier(&l1).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.result.render() == "Pending"));
        assert!(!rows[0].timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_register_keeps_existing_result() {
        let store = setup_test_db().await;
        let l1 = batch("L1");
        store
            .upsert(&id("1"), &l1, &StoredResult::completed(authorized()))
            .await
            .unwrap();

        store.register_pending(&l1, &[id("1")]).await.unwrap();

        let found = store.find(&id("1"), &l1).await.unwrap().unwrap();
        assert!(found.result.render().contains("Status: Autorizado"));
    }

    #[tokio::test]
    async fn test_same_identifier_in_two_batches() {
        let store = setup_test_db().await;
        store.register_pending(&batch("L1"), &[id("1")]).await.unwrap();
        store.register_pending(&batch("L2"), &[id("1")]).await.unwrap();

        assert!(store.find(&id("1"), &batch("L1")).await.unwrap().is_some());
        assert!(store.find(&id("1"), &batch("L2")).await.unwrap().is_some());
        assert_eq!(store.latest_batch_id().await.unwrap(), Some(batch("L2")));
    }

    #[tokio::test]
    async fn test_upsert_updates_then_inserts() {
        let store = setup_test_db().await;
        let l1 = batch("L1");
        store.register_pending(&l1, &[id("1")]).await.unwrap();

        let outcome = store
            .upsert(&id("1"), &l1, &StoredResult::reprocessing(1, 3, "refused"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let outcome = store
            .upsert(&id("9"), &l1, &StoredResult::completed(authorized()))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let rows = store.latest_per_identifier(&l1).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].result.render(),
            "Status: Reprocessing (1/3), Mensagem: refused"
        );
    }

    #[tokio::test]
    async fn test_typed_detail_round_trips() {
        let store = setup_test_db().await;
        let l1 = batch("L1");
        let mut result = StoredResult::reprocessing(1, 3, "refused");
        result.annotate(Annotation::Exception {
            message: "timeout".to_string(),
        });
        store.upsert(&id("1"), &l1, &result).await.unwrap();

        let found = store.find(&id("1"), &l1).await.unwrap().unwrap();
        assert_eq!(found.result, result);
        assert_eq!(found.timestamp.len(), "2024-01-15 12:00:00".len());
    }

    #[tokio::test]
    async fn test_legacy_rows_are_read_as_text() {
        let store = setup_test_db().await;
        sqlx::query(
            "INSERT INTO consultas (cpf, resultado, data, lote_id) VALUES ('5', 'Nome: X, Status: Autorizado', '2023-12-01 08:00:00', 'OLD')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let rows = store.latest_per_identifier(&batch("OLD")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result.render(), "Nome: X, Status: Autorizado");
        assert_eq!(rows[0].result.status_fields().status, "Autorizado");
    }

    #[tokio::test]
    async fn test_latest_per_identifier_picks_max_id() {
        let store = setup_test_db().await;
        // Legacy databases may hold duplicates inserted before the unique index
        sqlx::query("DROP INDEX idx_consultas_cpf_lote")
            .execute(&store.pool)
            .await
            .unwrap();
        for text in ["Status: Old", "Status: New"] {
            sqlx::query(
                "INSERT INTO consultas (cpf, resultado, data, lote_id) VALUES ('7', ?, '2024-01-01 00:00:00', 'L1')",
            )
            .bind(text)
            .execute(&store.pool)
            .await
            .unwrap();
        }

        let rows = store.latest_per_identifier(&batch("L1")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result.status_fields().status, "New");
    }

    #[tokio::test]
    async fn test_latest_batch_id_empty_store() {
        let store = setup_test_db().await;
        assert_eq!(store.latest_batch_id().await.unwrap(), None);
    }
}
