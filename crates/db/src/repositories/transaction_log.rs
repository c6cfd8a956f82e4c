use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;

use opexflow_core::domain::initiative::InitiativeId;
use opexflow_core::domain::transaction::{Decision, TransactionId, WorkflowTransaction};

use super::{RepositoryError, TransactionLogRepository};
use crate::DbPool;

pub struct SqlTransactionLogRepository {
    pool: DbPool,
}

impl SqlTransactionLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const INSERT_SQL: &str = "INSERT INTO workflow_transactions (initiative_id, stage_number,
     stage_name, decision, comment, action_by, action_at, pending_with, initiative_lead,
     moc_required, moc_number, capex_required, capex_details)
 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Append inside an open storage transaction; used by `commit_transition` so
/// the log row and the stage advance land together.
pub(crate) async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    transaction: &WorkflowTransaction,
) -> Result<TransactionId, RepositoryError> {
    let result = bind_transaction(sqlx::query(INSERT_SQL), transaction).execute(&mut **tx).await?;
    Ok(TransactionId(result.last_insert_rowid()))
}

fn bind_transaction<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    transaction: &'q WorkflowTransaction,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&transaction.initiative_id.0)
        .bind(i64::from(transaction.stage_number))
        .bind(&transaction.stage_name)
        .bind(transaction.decision.as_str())
        .bind(&transaction.comment)
        .bind(&transaction.action_by)
        .bind(transaction.action_at.to_rfc3339())
        .bind(&transaction.pending_with)
        .bind(&transaction.initiative_lead)
        .bind(transaction.moc_required)
        .bind(&transaction.moc_number)
        .bind(transaction.capex_required)
        .bind(&transaction.capex_details)
}

fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<WorkflowTransaction, RepositoryError> {
    let initiative_id: String =
        row.try_get("initiative_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stage_number: i64 =
        row.try_get("stage_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stage_name: String =
        row.try_get("stage_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decision: String =
        row.try_get("decision").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: String =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_by: String =
        row.try_get("action_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_at: String =
        row.try_get("action_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let pending_with: Option<String> =
        row.try_get("pending_with").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let initiative_lead: Option<String> =
        row.try_get("initiative_lead").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let moc_required: Option<bool> =
        row.try_get("moc_required").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let moc_number: Option<String> =
        row.try_get("moc_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let capex_required: Option<bool> =
        row.try_get("capex_required").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let capex_details: Option<String> =
        row.try_get("capex_details").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(WorkflowTransaction {
        initiative_id: InitiativeId(initiative_id),
        stage_number: u8::try_from(stage_number)
            .map_err(|_| RepositoryError::Decode(format!("stage_number out of range: {stage_number}")))?,
        stage_name,
        decision: Decision::from_str(&decision).map_err(RepositoryError::Decode)?,
        comment,
        action_by,
        action_at: chrono::DateTime::parse_from_rfc3339(&action_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| RepositoryError::Decode(format!("action_at: {e}")))?,
        pending_with,
        initiative_lead,
        moc_required,
        moc_number,
        capex_required,
        capex_details,
    })
}

#[async_trait]
impl TransactionLogRepository for SqlTransactionLogRepository {
    async fn append(
        &self,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError> {
        let result = bind_transaction(sqlx::query(INSERT_SQL), transaction)
            .execute(&self.pool)
            .await?;
        Ok(TransactionId(result.last_insert_rowid()))
    }

    async fn list_for(
        &self,
        initiative_id: &InitiativeId,
    ) -> Result<Vec<WorkflowTransaction>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT initiative_id, stage_number, stage_name, decision, comment, action_by,
                    action_at, pending_with, initiative_lead, moc_required, moc_number,
                    capex_required, capex_details
             FROM workflow_transactions
             WHERE initiative_id = ?
             ORDER BY id ASC",
        )
        .bind(&initiative_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect::<Result<Vec<_>, _>>()
    }
}
