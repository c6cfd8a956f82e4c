use crate::domain::initiative::{Initiative, InitiativeStatus};
use crate::domain::transaction::{Decision, WorkflowTransaction};
use crate::domain::user::RoleCode;
use crate::workflow::stages::{self, FINAL_STEP};

/// Overall status as a pure function of the decision history. The stored
/// status field must always agree with this derivation; `reconcile` asserts
/// it.
pub fn derive_status(transactions: &[WorkflowTransaction]) -> InitiativeStatus {
    if transactions.iter().any(|transaction| transaction.decision == Decision::Rejected) {
        return InitiativeStatus::Rejected;
    }
    if transactions.is_empty() {
        return InitiativeStatus::Proposed;
    }
    let final_approved = transactions.iter().any(|transaction| {
        transaction.decision == Decision::Approved && transaction.stage_number == FINAL_STEP
    });
    if final_approved {
        InitiativeStatus::Completed
    } else {
        InitiativeStatus::InProgress
    }
}

/// The role next responsible for the initiative, or `None` once terminal.
/// Derived from the stage pointer and the registry — never stored, never
/// guessed by a caller.
pub fn pending_with(initiative: &Initiative) -> Option<RoleCode> {
    if initiative.is_terminal() {
        return None;
    }
    stages::stage_at(initiative.current_stage).ok().map(|stage| stage.required_role)
}

/// Whether the stored status agrees with the transaction history.
pub fn reconcile(initiative: &Initiative, transactions: &[WorkflowTransaction]) -> bool {
    initiative.status == derive_status(transactions)
}
