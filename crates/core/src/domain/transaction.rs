use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::initiative::InitiativeId;

/// Storage-assigned identifier of a logged transaction. The id sequence is
/// monotone per log and doubles as the ordering key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown decision `{other}`")),
        }
    }
}

/// One durable record of a stage decision. Immutable once appended; the full
/// chain per initiative is the audit trail and the source of the lifecycle
/// derivation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTransaction {
    pub initiative_id: InitiativeId,
    pub stage_number: u8,
    pub stage_name: String,
    pub decision: Decision,
    pub comment: String,
    pub action_by: String,
    pub action_at: DateTime<Utc>,
    /// Required role of the next actionable stage; `None` once terminal.
    pub pending_with: Option<String>,
    pub initiative_lead: Option<String>,
    pub moc_required: Option<bool>,
    pub moc_number: Option<String>,
    pub capex_required: Option<bool>,
    pub capex_details: Option<String>,
}
