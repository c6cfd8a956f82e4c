use thiserror::Error;

/// Typed outcomes of a workflow call. Every variant surfaces to the caller;
/// only `Conflict` is safe to retry automatically (after a refetch).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("initiative `{0}` not found or no longer open for decisions")]
    NotFound(String),
    #[error("role `{role}` at site `{site}` may not act on stage {step}")]
    Forbidden { role: String, site: String, step: u8 },
    #[error("submission is missing required fields: {}", missing_fields.join(", "))]
    InvalidPayload { missing_fields: Vec<String> },
    #[error("initiative `{0}` changed while the decision was in flight; refetch and retry")]
    Conflict(String),
    #[error("stage number {0} is outside the workflow definition")]
    InvalidStage(u8),
}

impl WorkflowError {
    pub fn missing(fields: &[&str]) -> Self {
        Self::InvalidPayload { missing_fields: fields.iter().map(ToString::to_string).collect() }
    }

    /// Whether the caller may retry the same call without user correction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
