pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::initiative::{
    BudgetType, CapexAssessment, DisciplineRef, Initiative, InitiativeDraft, InitiativeId,
    InitiativeStatus, MocAssessment, Priority, SiteRef,
};
pub use domain::transaction::{Decision, TransactionId, WorkflowTransaction};
pub use domain::user::{Actor, RoleCode};
pub use errors::WorkflowError;
pub use workflow::engine::{TransitionOutcome, WorkflowEngine};
pub use workflow::payload::{StagePayload, StageSubmission};
pub use workflow::stages::{StageDefinition, FINAL_STEP, FIRST_STEP};
