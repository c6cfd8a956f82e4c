use async_trait::async_trait;
use thiserror::Error;

use opexflow_core::domain::initiative::{Initiative, InitiativeId};
use opexflow_core::domain::transaction::{TransactionId, WorkflowTransaction};

pub mod initiative;
pub mod memory;
pub mod transaction_log;

pub use initiative::SqlInitiativeRepository;
pub use memory::InMemoryWorkflowStore;
pub use transaction_log::SqlTransactionLogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// The optimistic concurrency check failed: the initiative's version
    /// moved between read and write. Nothing was committed.
    #[error("initiative `{0}` version changed since read")]
    VersionConflict(String),
}

#[async_trait]
pub trait InitiativeRepository: Send + Sync {
    async fn find_by_id(&self, id: &InitiativeId) -> Result<Option<Initiative>, RepositoryError>;

    async fn insert(&self, initiative: &Initiative) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<Initiative>, RepositoryError>;

    /// Initiatives proposed at a site in a given year, for id sequencing.
    async fn count_for_site_in_year(
        &self,
        site_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError>;

    async fn count_for_site_discipline_in_year(
        &self,
        site_code: &str,
        discipline_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError>;

    /// Persist an engine transition: the version-guarded initiative update
    /// and the transaction-log append happen in one storage transaction, so
    /// the stage pointer never advances without its durable decision record.
    async fn commit_transition(
        &self,
        initiative: &Initiative,
        expected_version: i64,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError>;
}

/// Append-only log of workflow decisions. There is deliberately no update or
/// delete surface.
#[async_trait]
pub trait TransactionLogRepository: Send + Sync {
    async fn append(
        &self,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError>;

    /// Oldest first, ordered by the storage-assigned id.
    async fn list_for(
        &self,
        initiative_id: &InitiativeId,
    ) -> Result<Vec<WorkflowTransaction>, RepositoryError>;
}
