use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::initiative::{CapexAssessment, Initiative, InitiativeStatus, MocAssessment};
use crate::domain::transaction::{Decision, WorkflowTransaction};
use crate::domain::user::Actor;
use crate::errors::WorkflowError;
use crate::workflow::payload::{StagePayload, StageSubmission};
use crate::workflow::{authorize, stages, validate};

/// Result of one accepted transition: the initiative with its workflow-owned
/// fields advanced (version bumped, nothing persisted yet) and the decision
/// record to append alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub initiative: Initiative,
    pub transaction: WorkflowTransaction,
}

/// The workflow state machine. States are stage numbers 1..=5 plus the two
/// absorbing states COMPLETED and REJECTED; `approve` and `reject` are the
/// only transitions. Pure: performs no I/O, takes the loaded initiative and
/// returns the would-be next state for the storage collaborator to commit.
#[derive(Clone, Debug, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn approve(
        &self,
        initiative: &Initiative,
        actor: &Actor,
        submission: &StageSubmission,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let step = self.actionable_step(initiative)?;
        let stage = stages::stage_at(step)?;
        self.require_authorized(actor, initiative, step)?;
        validate::validate(step, Decision::Approved, submission)?;

        let mut updated = initiative.clone();
        merge_stage_outputs(&mut updated, &submission.data);

        let now = Utc::now();
        let pending_with = match stages::next_stage(step)? {
            Some(next) => {
                updated.current_stage = next.step;
                updated.status = InitiativeStatus::InProgress;
                Some(next.required_role.as_str().to_string())
            }
            None => {
                // Terminal stage approved: the stage pointer stays put as the
                // completion marker.
                updated.status = InitiativeStatus::Completed;
                None
            }
        };
        updated.version += 1;
        updated.updated_at = now;

        let mut transaction = WorkflowTransaction {
            initiative_id: updated.id.clone(),
            stage_number: step,
            stage_name: stage.name.to_string(),
            decision: Decision::Approved,
            comment: submission.comment.trim().to_string(),
            action_by: actor.identity.clone(),
            action_at: now,
            pending_with,
            initiative_lead: None,
            moc_required: None,
            moc_number: None,
            capex_required: None,
            capex_details: None,
        };
        capture_stage_fields(&mut transaction, &submission.data);

        Ok(TransitionOutcome { initiative: updated, transaction })
    }

    pub fn reject(
        &self,
        initiative: &Initiative,
        actor: &Actor,
        comment: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let step = self.actionable_step(initiative)?;
        let stage = stages::stage_at(step)?;
        self.require_authorized(actor, initiative, step)?;
        let submission = StageSubmission::general(comment);
        validate::validate(step, Decision::Rejected, &submission)?;

        let now = Utc::now();
        let mut updated = initiative.clone();
        updated.status = InitiativeStatus::Rejected;
        updated.version += 1;
        updated.updated_at = now;

        let transaction = WorkflowTransaction {
            initiative_id: updated.id.clone(),
            stage_number: step,
            stage_name: stage.name.to_string(),
            decision: Decision::Rejected,
            comment: comment.trim().to_string(),
            action_by: actor.identity.clone(),
            action_at: now,
            pending_with: None,
            initiative_lead: None,
            moc_required: None,
            moc_number: None,
            capex_required: None,
            capex_details: None,
        };

        Ok(TransitionOutcome { initiative: updated, transaction })
    }

    pub fn approve_with_audit<S>(
        &self,
        initiative: &Initiative,
        actor: &Actor,
        submission: &StageSubmission,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, WorkflowError>
    where
        S: AuditSink,
    {
        let result = self.approve(initiative, actor, submission);
        emit_transition_event(sink, audit, Decision::Approved, initiative, &result);
        result
    }

    pub fn reject_with_audit<S>(
        &self,
        initiative: &Initiative,
        actor: &Actor,
        comment: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, WorkflowError>
    where
        S: AuditSink,
    {
        let result = self.reject(initiative, actor, comment);
        emit_transition_event(sink, audit, Decision::Rejected, initiative, &result);
        result
    }

    /// The stage a decision would apply to. Absorbing states accept no
    /// further transitions.
    fn actionable_step(&self, initiative: &Initiative) -> Result<u8, WorkflowError> {
        if initiative.is_terminal() {
            return Err(WorkflowError::NotFound(initiative.id.0.clone()));
        }
        Ok(initiative.current_stage)
    }

    fn require_authorized(
        &self,
        actor: &Actor,
        initiative: &Initiative,
        step: u8,
    ) -> Result<(), WorkflowError> {
        if authorize::can_act(actor, initiative, step)? {
            return Ok(());
        }
        Err(WorkflowError::Forbidden {
            role: actor.role.as_str().to_string(),
            site: actor.site.clone().unwrap_or_else(|| "-".to_string()),
            step,
        })
    }
}

/// Fold the approved stage's payload into the initiative's accumulated
/// outputs. The stage-number guard in `actionable_step` makes this a
/// set-at-most-once merge per initiative.
fn merge_stage_outputs(initiative: &mut Initiative, payload: &StagePayload) {
    match payload {
        StagePayload::General => {}
        StagePayload::LeadAssignment { initiative_lead } => {
            initiative.initiative_lead = Some(initiative_lead.trim().to_string());
        }
        StagePayload::MocAssessment { moc_required, moc_number } => {
            initiative.moc = Some(MocAssessment {
                required: moc_required.unwrap_or(false),
                number: moc_number.clone(),
            });
        }
        StagePayload::CapexAssessment { capex_required, capex_details } => {
            initiative.capex = Some(CapexAssessment {
                required: capex_required.unwrap_or(false),
                details: capex_details.clone(),
            });
        }
    }
}

fn capture_stage_fields(transaction: &mut WorkflowTransaction, payload: &StagePayload) {
    match payload {
        StagePayload::General => {}
        StagePayload::LeadAssignment { initiative_lead } => {
            transaction.initiative_lead = Some(initiative_lead.trim().to_string());
        }
        StagePayload::MocAssessment { moc_required, moc_number } => {
            transaction.moc_required = *moc_required;
            transaction.moc_number = moc_number.clone();
        }
        StagePayload::CapexAssessment { capex_required, capex_details } => {
            transaction.capex_required = *capex_required;
            transaction.capex_details = capex_details.clone();
        }
    }
}

fn emit_transition_event<S>(
    sink: &S,
    audit: &AuditContext,
    decision: Decision,
    initiative: &Initiative,
    result: &Result<TransitionOutcome, WorkflowError>,
) where
    S: AuditSink,
{
    match result {
        Ok(outcome) => {
            let event_type = match decision {
                Decision::Approved => "workflow.stage_approved",
                Decision::Rejected => "workflow.stage_rejected",
            };
            sink.emit(
                AuditEvent::new(
                    Some(initiative.id.clone()),
                    audit.correlation_id.clone(),
                    event_type,
                    AuditCategory::Workflow,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("stage", outcome.transaction.stage_number.to_string())
                .with_metadata("status", outcome.initiative.status.as_str()),
            );
        }
        Err(error) => {
            let (category, outcome) = match error {
                WorkflowError::Forbidden { .. } => (AuditCategory::Authorization, AuditOutcome::Denied),
                WorkflowError::InvalidPayload { .. } => (AuditCategory::Validation, AuditOutcome::Denied),
                _ => (AuditCategory::Workflow, AuditOutcome::Failed),
            };
            sink.emit(
                AuditEvent::new(
                    Some(initiative.id.clone()),
                    audit.correlation_id.clone(),
                    "workflow.transition_refused",
                    category,
                    audit.actor.clone(),
                    outcome,
                )
                .with_metadata("error", error.to_string()),
            );
        }
    }
}
