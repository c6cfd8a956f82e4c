use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Datelike;

use opexflow_core::domain::initiative::{Initiative, InitiativeId};
use opexflow_core::domain::transaction::{TransactionId, WorkflowTransaction};

use super::{InitiativeRepository, RepositoryError, TransactionLogRepository};

/// In-memory stand-in for the SQL store with the same optimistic-concurrency
/// semantics. Used by service-level tests; cloning shares the underlying
/// state.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    initiatives: HashMap<String, Initiative>,
    transactions: Vec<(i64, WorkflowTransaction)>,
    next_transaction_id: i64,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn append_locked(inner: &mut Inner, transaction: &WorkflowTransaction) -> TransactionId {
        inner.next_transaction_id += 1;
        let id = inner.next_transaction_id;
        inner.transactions.push((id, transaction.clone()));
        TransactionId(id)
    }
}

#[async_trait]
impl InitiativeRepository for InMemoryWorkflowStore {
    async fn find_by_id(&self, id: &InitiativeId) -> Result<Option<Initiative>, RepositoryError> {
        Ok(self.lock().initiatives.get(&id.0).cloned())
    }

    async fn insert(&self, initiative: &Initiative) -> Result<(), RepositoryError> {
        self.lock().initiatives.insert(initiative.id.0.clone(), initiative.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Initiative>, RepositoryError> {
        let mut initiatives: Vec<Initiative> = self.lock().initiatives.values().cloned().collect();
        initiatives.sort_by(|left, right| right.created_at.cmp(&left.created_at).then_with(|| right.id.0.cmp(&left.id.0)));
        Ok(initiatives)
    }

    async fn count_for_site_in_year(
        &self,
        site_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .initiatives
            .values()
            .filter(|initiative| {
                initiative.site_code() == Some(site_code)
                    && initiative.proposal_date.year() == year
            })
            .count();
        Ok(count as i64)
    }

    async fn count_for_site_discipline_in_year(
        &self,
        site_code: &str,
        discipline_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .initiatives
            .values()
            .filter(|initiative| {
                initiative.site_code() == Some(site_code)
                    && initiative.discipline.code == discipline_code
                    && initiative.proposal_date.year() == year
            })
            .count();
        Ok(count as i64)
    }

    async fn commit_transition(
        &self,
        initiative: &Initiative,
        expected_version: i64,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError> {
        let mut inner = self.lock();
        let stored = inner
            .initiatives
            .get(&initiative.id.0)
            .ok_or_else(|| RepositoryError::VersionConflict(initiative.id.0.clone()))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict(initiative.id.0.clone()));
        }
        inner.initiatives.insert(initiative.id.0.clone(), initiative.clone());
        Ok(Self::append_locked(&mut inner, transaction))
    }
}

#[async_trait]
impl TransactionLogRepository for InMemoryWorkflowStore {
    async fn append(
        &self,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError> {
        let mut inner = self.lock();
        Ok(Self::append_locked(&mut inner, transaction))
    }

    async fn list_for(
        &self,
        initiative_id: &InitiativeId,
    ) -> Result<Vec<WorkflowTransaction>, RepositoryError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .filter(|(_, transaction)| transaction.initiative_id == *initiative_id)
            .map(|(_, transaction)| transaction.clone())
            .collect())
    }
}
