use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::workflow::stages::FIRST_STEP;

/// Business identifier of an initiative (`SITE-YY-DD-AB-123`), distinct from
/// any storage-assigned key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InitiativeId(pub String);

impl std::fmt::Display for InitiativeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRef {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineRef {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitiativeStatus {
    Proposed,
    InProgress,
    /// Present in stored data from the original status set; the lifecycle
    /// derivation never produces it.
    Approved,
    Completed,
    Rejected,
}

impl InitiativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "PROPOSED",
            Self::InProgress => "IN_PROGRESS",
            Self::Approved => "APPROVED",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Absorbing states: no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetType {
    Budgeted,
    NonBudgeted,
}

impl BudgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budgeted => "BUDGETED",
            Self::NonBudgeted => "NON_BUDGETED",
        }
    }
}

/// Outcome of the stage-4 assessment, captured on approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MocAssessment {
    pub required: bool,
    pub number: Option<String>,
}

/// Outcome of the stage-5 assessment, captured on approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapexAssessment {
    pub required: bool,
    pub details: Option<String>,
}

/// Submission-time fields of an initiative, before an id is assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub site: SiteRef,
    pub discipline: DisciplineRef,
    pub proposer: String,
    pub priority: Priority,
    pub budget_type: BudgetType,
    pub estimated_savings: Decimal,
    pub proposal_date: NaiveDate,
    pub expected_closure_date: NaiveDate,
}

/// An operational-excellence initiative. Workflow-owned fields (`status`,
/// `current_stage`, the accumulated stage outputs and `version`) are mutated
/// only through `WorkflowEngine` transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: InitiativeId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub site: Option<SiteRef>,
    pub discipline: DisciplineRef,
    pub proposer: String,
    pub priority: Priority,
    pub budget_type: BudgetType,
    pub estimated_savings: Decimal,
    pub proposal_date: NaiveDate,
    pub expected_closure_date: NaiveDate,
    pub status: InitiativeStatus,
    pub current_stage: u8,
    pub initiative_lead: Option<String>,
    pub moc: Option<MocAssessment>,
    pub capex: Option<CapexAssessment>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Initiative {
    /// Build a new initiative in PROPOSED at stage 1, enforcing the
    /// creation invariants. All offending fields are reported together.
    pub fn propose(
        id: InitiativeId,
        draft: InitiativeDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        let mut missing_fields = Vec::new();
        if draft.title.trim().is_empty() {
            missing_fields.push("title".to_string());
        }
        if draft.category.trim().is_empty() {
            missing_fields.push("category".to_string());
        }
        if draft.site.code.trim().is_empty() {
            missing_fields.push("site".to_string());
        }
        if draft.discipline.code.trim().is_empty() {
            missing_fields.push("discipline".to_string());
        }
        if draft.proposer.trim().is_empty() {
            missing_fields.push("proposer".to_string());
        }
        if draft.estimated_savings <= Decimal::ZERO {
            missing_fields.push("estimatedSavings".to_string());
        }
        if draft.expected_closure_date <= draft.proposal_date {
            missing_fields.push("expectedClosureDate".to_string());
        }
        if !missing_fields.is_empty() {
            return Err(WorkflowError::InvalidPayload { missing_fields });
        }

        Ok(Self {
            id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            site: Some(draft.site),
            discipline: draft.discipline,
            proposer: draft.proposer,
            priority: draft.priority,
            budget_type: draft.budget_type,
            estimated_savings: draft.estimated_savings,
            proposal_date: draft.proposal_date,
            expected_closure_date: draft.expected_closure_date,
            status: InitiativeStatus::Proposed,
            current_stage: FIRST_STEP,
            initiative_lead: None,
            moc: None,
            capex: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn site_code(&self) -> Option<&str> {
        self.site.as_ref().map(|site| site.code.as_str())
    }
}

impl std::str::FromStr for InitiativeStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PROPOSED" => Ok(Self::Proposed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "APPROVED" => Ok(Self::Approved),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown initiative status `{other}`")),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

impl std::str::FromStr for BudgetType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BUDGETED" => Ok(Self::Budgeted),
            "NON_BUDGETED" => Ok(Self::NonBudgeted),
            other => Err(format!("unknown budget type `{other}`")),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{
        BudgetType, DisciplineRef, Initiative, InitiativeDraft, InitiativeId, Priority, SiteRef,
    };

    pub fn draft() -> InitiativeDraft {
        InitiativeDraft {
            title: "Reduce steam losses in HSD1 utilities".to_string(),
            description: "Recover condensate and fix trap failures".to_string(),
            category: "COST_REDUCTION".to_string(),
            site: SiteRef { code: "HSD1".to_string(), name: "HSD1 Plant".to_string() },
            discipline: DisciplineRef { code: "EN".to_string(), name: "Energy".to_string() },
            proposer: "hsd1_stld@example.com".to_string(),
            priority: Priority::Medium,
            budget_type: BudgetType::Budgeted,
            estimated_savings: Decimal::new(250_000_00, 2),
            proposal_date: NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
            expected_closure_date: NaiveDate::from_ymd_opt(2025, 9, 30).expect("valid date"),
        }
    }

    pub fn proposed(id: &str) -> Initiative {
        Initiative::propose(InitiativeId(id.to_string()), draft(), Utc::now())
            .expect("fixture draft is valid")
    }
}
