use serde::Serialize;

use crate::domain::user::RoleCode;
use crate::errors::WorkflowError;

pub const FIRST_STEP: u8 = 1;
pub const FINAL_STEP: u8 = 5;

/// Static definition of one approval checkpoint. The registry is the single
/// source of truth for ordering and for the role responsible at each step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub step: u8,
    pub name: &'static str,
    pub required_role: RoleCode,
    pub responsibility: &'static str,
    pub annexure: Option<&'static str>,
    pub description: &'static str,
}

const STAGES: [StageDefinition; 5] = [
    StageDefinition {
        step: 1,
        name: "Register initiative",
        required_role: RoleCode::Stld,
        responsibility: "Site TSD Lead",
        annexure: None,
        description: "Initial registration of the initiative",
    },
    StageDefinition {
        step: 2,
        name: "Approval",
        required_role: RoleCode::Sh,
        responsibility: "Site Head",
        annexure: None,
        description: "Site head approval of the initiative",
    },
    StageDefinition {
        step: 3,
        name: "Define Responsibilities",
        required_role: RoleCode::Eh,
        responsibility: "Engg Head",
        annexure: Some("Annexure 2"),
        description: "Engineering head defines responsibilities and selects initiative lead",
    },
    StageDefinition {
        step: 4,
        name: "MOC Assessment & Process",
        required_role: RoleCode::Il,
        responsibility: "Initiative Lead",
        annexure: None,
        description: "Assess MOC requirement and complete MOC process if required",
    },
    StageDefinition {
        step: 5,
        name: "CAPEX Assessment & Process",
        required_role: RoleCode::Il,
        responsibility: "Initiative Lead",
        annexure: None,
        description: "Assess CAPEX requirement and complete CAPEX process if required",
    },
];

/// Look up a stage by step number. Total over 1..=5; anything else is a
/// configuration-level error, not a user error.
pub fn stage_at(step: u8) -> Result<&'static StageDefinition, WorkflowError> {
    if !(FIRST_STEP..=FINAL_STEP).contains(&step) {
        return Err(WorkflowError::InvalidStage(step));
    }
    Ok(&STAGES[usize::from(step - 1)])
}

/// The stage after `step`, or `Ok(None)` when `step` is terminal.
pub fn next_stage(step: u8) -> Result<Option<&'static StageDefinition>, WorkflowError> {
    stage_at(step)?;
    if step == FINAL_STEP {
        return Ok(None);
    }
    Ok(Some(&STAGES[usize::from(step)]))
}

pub fn all() -> &'static [StageDefinition] {
    &STAGES
}
