use std::sync::Arc;

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{info, warn};

use opexflow_core::domain::initiative::{Initiative, InitiativeDraft, InitiativeId};
use opexflow_core::domain::transaction::{TransactionId, WorkflowTransaction};
use opexflow_core::domain::user::Actor;
use opexflow_core::errors::WorkflowError;
use opexflow_core::workflow::engine::WorkflowEngine;
use opexflow_core::workflow::payload::{StagePayload, StageSubmission};
use opexflow_core::workflow::{lifecycle, stages};
use opexflow_db::{InitiativeRepository, RepositoryError, TransactionLogRepository};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::VersionConflict(id) => Self::Workflow(WorkflowError::Conflict(id)),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Loose wire shape of an approve call's stage data. Converted to the typed
/// `StagePayload` for the initiative's current stage before the engine sees
/// it; whatever is absent surfaces through the validator.
#[derive(Clone, Debug, Default)]
pub struct ApprovalFields {
    pub comment: String,
    pub initiative_lead: Option<String>,
    pub moc_required: Option<bool>,
    pub moc_number: Option<String>,
    pub capex_required: Option<bool>,
    pub capex_details: Option<String>,
}

/// The stage an initiative is waiting at, as reported to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingStage {
    pub step_number: u8,
    pub stage_name: &'static str,
    pub required_role: &'static str,
    pub pending_with: Option<&'static str>,
}

/// One committed decision: the log id it was appended under, the updated
/// initiative and the record itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionRecord {
    pub transaction_id: TransactionId,
    pub initiative: Initiative,
    pub transaction: WorkflowTransaction,
}

/// Orchestrates the engine against storage: loads the initiative, lets the
/// pure state machine compute the transition, then commits stage advance and
/// log append atomically under the optimistic version check.
pub struct WorkflowService {
    initiatives: Arc<dyn InitiativeRepository>,
    log: Arc<dyn TransactionLogRepository>,
    engine: WorkflowEngine,
}

impl WorkflowService {
    pub fn new(
        initiatives: Arc<dyn InitiativeRepository>,
        log: Arc<dyn TransactionLogRepository>,
    ) -> Self {
        Self { initiatives, log, engine: WorkflowEngine::new() }
    }

    /// Register a new initiative: validate the draft, assign the business id
    /// and store it PROPOSED at stage 1.
    pub async fn submit(&self, draft: InitiativeDraft) -> Result<Initiative, ServiceError> {
        let id = self.next_initiative_id(&draft).await?;
        let initiative = Initiative::propose(id, draft, Utc::now())?;
        self.initiatives.insert(&initiative).await?;

        info!(
            event_name = "initiative.submitted",
            initiative_id = %initiative.id,
            site = initiative.site_code().unwrap_or("-"),
            "initiative registered"
        );
        Ok(initiative)
    }

    pub async fn get(&self, id: &InitiativeId) -> Result<Initiative, ServiceError> {
        self.initiatives
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::Workflow(WorkflowError::NotFound(id.0.clone())))
    }

    pub async fn list(&self) -> Result<Vec<Initiative>, ServiceError> {
        Ok(self.initiatives.list().await?)
    }

    /// The stage the initiative currently sits at. `pending_with` is `None`
    /// once the workflow is terminal.
    pub async fn pending_stage(&self, id: &InitiativeId) -> Result<PendingStage, ServiceError> {
        let initiative = self.get(id).await?;
        let stage = stages::stage_at(initiative.current_stage).map_err(ServiceError::Workflow)?;
        let pending_with = lifecycle::pending_with(&initiative).map(|role| role.as_str());
        Ok(PendingStage {
            step_number: stage.step,
            stage_name: stage.name,
            required_role: stage.required_role.as_str(),
            pending_with,
        })
    }

    pub async fn approve(
        &self,
        id: &InitiativeId,
        actor: &Actor,
        fields: ApprovalFields,
    ) -> Result<DecisionRecord, ServiceError> {
        let initiative = self.get(id).await?;
        let submission = submission_for_stage(initiative.current_stage, fields);
        let outcome = match self.engine.approve(&initiative, actor, &submission) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "workflow.approve_refused",
                    initiative_id = %id,
                    stage = initiative.current_stage,
                    error = %error,
                    "approval refused"
                );
                return Err(error.into());
            }
        };

        let transaction_id = self
            .initiatives
            .commit_transition(&outcome.initiative, initiative.version, &outcome.transaction)
            .await?;

        info!(
            event_name = "workflow.stage_approved",
            initiative_id = %id,
            stage = outcome.transaction.stage_number,
            status = outcome.initiative.status.as_str(),
            action_by = %actor.identity,
            "stage approved"
        );
        Ok(DecisionRecord {
            transaction_id,
            initiative: outcome.initiative,
            transaction: outcome.transaction,
        })
    }

    pub async fn reject(
        &self,
        id: &InitiativeId,
        actor: &Actor,
        comment: &str,
    ) -> Result<DecisionRecord, ServiceError> {
        let initiative = self.get(id).await?;
        let outcome = match self.engine.reject(&initiative, actor, comment) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "workflow.reject_refused",
                    initiative_id = %id,
                    stage = initiative.current_stage,
                    error = %error,
                    "rejection refused"
                );
                return Err(error.into());
            }
        };

        let transaction_id = self
            .initiatives
            .commit_transition(&outcome.initiative, initiative.version, &outcome.transaction)
            .await?;

        info!(
            event_name = "workflow.stage_rejected",
            initiative_id = %id,
            stage = outcome.transaction.stage_number,
            action_by = %actor.identity,
            "stage rejected"
        );
        Ok(DecisionRecord {
            transaction_id,
            initiative: outcome.initiative,
            transaction: outcome.transaction,
        })
    }

    /// Decision history, oldest first.
    pub async fn transactions(
        &self,
        id: &InitiativeId,
    ) -> Result<Vec<WorkflowTransaction>, ServiceError> {
        self.get(id).await?;
        Ok(self.log.list_for(id).await?)
    }

    /// `SITE-YY-DD-AB-123`: site code, proposal year, discipline code,
    /// per-discipline sequence, per-site sequence.
    async fn next_initiative_id(
        &self,
        draft: &InitiativeDraft,
    ) -> Result<InitiativeId, ServiceError> {
        let site_code = draft.site.code.trim().to_ascii_uppercase();
        let discipline_code = draft.discipline.code.trim().to_ascii_uppercase();
        let year = draft.proposal_date.year();

        let discipline_seq = self
            .initiatives
            .count_for_site_discipline_in_year(&site_code, &discipline_code, year)
            .await?
            + 1;
        let overall_seq = self.initiatives.count_for_site_in_year(&site_code, year).await? + 1;

        Ok(InitiativeId(format!(
            "{site_code}-{:02}-{discipline_code}-{discipline_seq:02}-{overall_seq:03}",
            year % 100
        )))
    }
}

fn submission_for_stage(step: u8, fields: ApprovalFields) -> StageSubmission {
    let data = match step {
        3 => StagePayload::LeadAssignment {
            initiative_lead: fields.initiative_lead.unwrap_or_default(),
        },
        4 => StagePayload::MocAssessment {
            moc_required: fields.moc_required,
            moc_number: fields.moc_number,
        },
        5 => StagePayload::CapexAssessment {
            capex_required: fields.capex_required,
            capex_details: fields.capex_details,
        },
        _ => StagePayload::General,
    };
    StageSubmission { comment: fields.comment, data }
}
