use serde::{Deserialize, Serialize};

/// Stage-specific data captured on approval, keyed by the stage it belongs
/// to. Conditional fields stay optional inside their variant; the validator
/// decides what is missing. Rejections carry no stage data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StagePayload {
    /// Stages 1 and 2: nothing beyond the comment.
    General,
    /// Stage 3: the engineering head assigns the initiative lead.
    LeadAssignment { initiative_lead: String },
    /// Stage 4: MOC assessment; a number is required when MOC applies.
    MocAssessment { moc_required: Option<bool>, moc_number: Option<String> },
    /// Stage 5: CAPEX assessment; details are required when CAPEX applies.
    CapexAssessment { capex_required: Option<bool>, capex_details: Option<String> },
}

impl StagePayload {
    /// Which variant a given step expects.
    pub fn matches_step(&self, step: u8) -> bool {
        matches!(
            (self, step),
            (Self::General, 1 | 2)
                | (Self::LeadAssignment { .. }, 3)
                | (Self::MocAssessment { .. }, 4)
                | (Self::CapexAssessment { .. }, 5)
        )
    }

    /// Wire names of the fields an approval at `step` must carry, beyond the
    /// comment. Used to report a mismatched payload in full.
    pub fn required_fields_for(step: u8) -> &'static [&'static str] {
        match step {
            3 => &["initiativeLead"],
            4 => &["mocRequired"],
            5 => &["capexRequired"],
            _ => &[],
        }
    }
}

/// An approve call's input: the mandatory comment plus the stage payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSubmission {
    pub comment: String,
    pub data: StagePayload,
}

impl StageSubmission {
    pub fn general(comment: impl Into<String>) -> Self {
        Self { comment: comment.into(), data: StagePayload::General }
    }

    pub fn lead(comment: impl Into<String>, initiative_lead: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            data: StagePayload::LeadAssignment { initiative_lead: initiative_lead.into() },
        }
    }

    pub fn moc(comment: impl Into<String>, required: bool, number: Option<&str>) -> Self {
        Self {
            comment: comment.into(),
            data: StagePayload::MocAssessment {
                moc_required: Some(required),
                moc_number: number.map(ToString::to_string),
            },
        }
    }

    pub fn capex(comment: impl Into<String>, required: bool, details: Option<&str>) -> Self {
        Self {
            comment: comment.into(),
            data: StagePayload::CapexAssessment {
                capex_required: Some(required),
                capex_details: details.map(ToString::to_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StagePayload;

    #[test]
    fn variants_match_their_stages_only() {
        let general = StagePayload::General;
        assert!(general.matches_step(1));
        assert!(general.matches_step(2));
        assert!(!general.matches_step(3));

        let lead = StagePayload::LeadAssignment { initiative_lead: "il@example.com".to_string() };
        assert!(lead.matches_step(3));
        assert!(!lead.matches_step(4));

        let moc = StagePayload::MocAssessment { moc_required: Some(false), moc_number: None };
        assert!(moc.matches_step(4));
        assert!(!moc.matches_step(5));

        let capex =
            StagePayload::CapexAssessment { capex_required: Some(false), capex_details: None };
        assert!(capex.matches_step(5));
        assert!(!capex.matches_step(1));
    }

    #[test]
    fn required_fields_follow_the_stage_table() {
        assert!(StagePayload::required_fields_for(1).is_empty());
        assert!(StagePayload::required_fields_for(2).is_empty());
        assert_eq!(StagePayload::required_fields_for(3), &["initiativeLead"]);
        assert_eq!(StagePayload::required_fields_for(4), &["mocRequired"]);
        assert_eq!(StagePayload::required_fields_for(5), &["capexRequired"]);
    }
}
