// Batch status view - latest row per identifier, parsed the legacy way

use crate::domain::{pad_identifier, BatchId, QueryRecord};
use crate::error::{AppError, Result};
use crate::port::ResultStore;
use serde::Serialize;

/// One line of the status view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatusRow {
    pub cpf: String,
    #[serde(rename = "Nome")]
    pub nome: String,
    #[serde(rename = "Data Nascimento")]
    pub data_nascimento: String,
    #[serde(rename = "Data Admissao")]
    pub data_admissao: String,
    #[serde(rename = "Valor Liberado")]
    pub valor_liberado: String,
    #[serde(rename = "Margem")]
    pub margem: String,
    #[serde(rename = "Elegível")]
    pub elegivel: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Mensagem")]
    pub mensagem: String,
    pub data: String,
}

impl From<&QueryRecord> for BatchStatusRow {
    fn from(record: &QueryRecord) -> Self {
        let fields = record.result.status_fields();
        Self {
            cpf: pad_identifier(&record.identifier),
            nome: fields.nome,
            data_nascimento: fields.data_nascimento,
            data_admissao: fields.data_admissao,
            valor_liberado: fields.valor_liberado,
            margem: fields.margem,
            elegivel: fields.elegivel,
            status: fields.status,
            mensagem: fields.mensagem,
            data: record.timestamp.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStatus {
    pub batch_id: BatchId,
    pub rows: Vec<BatchStatusRow>,
}

impl BatchStatus {
    /// Rows whose status is "Autorizado"
    pub fn authorized_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == crate::domain::STATUS_AUTHORIZED)
            .count()
    }
}

/// Status view of `batch_id`, or of the most recent batch when omitted
pub async fn batch_status(store: &dyn ResultStore, batch_id: Option<&BatchId>) -> Result<BatchStatus> {
    let batch_id = match batch_id {
        Some(b) => b.clone(),
        None => store
            .latest_batch_id()
            .await?
            .ok_or_else(|| AppError::NotFound("no batch has been registered".to_string()))?,
    };

    let records = store.latest_per_identifier(&batch_id).await?;
    if records.is_empty() {
        return Err(AppError::NotFound(format!("batch {} has no rows", batch_id)));
    }

    Ok(BatchStatus {
        rows: records.iter().map(BatchStatusRow::from).collect(),
        batch_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identifier, ResultFields, StoredResult};
    use crate::port::result_store::mocks::InMemoryResultStore;

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_latest_batch_used_when_omitted() {
        let store = InMemoryResultStore::new();
        let l1 = BatchId::parse("L1").unwrap();
        let l2 = BatchId::parse("L2").unwrap();
        store.register_pending(&l1, &[id("1")]).await.unwrap();
        store.register_pending(&l2, &[id("123")]).await.unwrap();

        let status = batch_status(&store, None).await.unwrap();

        assert_eq!(status.batch_id, l2);
        assert_eq!(status.rows.len(), 1);
        assert_eq!(status.rows[0].cpf, "00000000123");
        assert_eq!(status.rows[0].status, "-");
    }

    #[tokio::test]
    async fn test_rows_follow_legacy_parse() {
        let store = InMemoryResultStore::new();
        let l1 = BatchId::parse("L1").unwrap();
        let mut result = StoredResult::completed(ResultFields::not_authorized("sem margem"));
        result.annotate(crate::domain::Annotation::HttpError { status: 503 });
        store.upsert(&id("1"), &l1, &result).await.unwrap();

        let status = batch_status(&store, Some(&l1)).await.unwrap();

        assert_eq!(status.rows[0].status, "Não autorizado");
        assert_eq!(status.rows[0].mensagem, "HTTP error 503 during reprocessing");
        assert_eq!(status.authorized_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_batch_is_not_found() {
        let store = InMemoryResultStore::new();
        let err = batch_status(&store, Some(&BatchId::parse("nope").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = batch_status(&store, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
