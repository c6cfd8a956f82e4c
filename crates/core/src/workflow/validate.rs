use crate::domain::transaction::Decision;
use crate::errors::WorkflowError;
use crate::workflow::payload::{StagePayload, StageSubmission};
use crate::workflow::stages;

/// Check that a submission carries everything the stage needs before the
/// decision is accepted. Every missing or blank field is reported in one
/// pass so the caller can surface all errors at once.
///
/// A rejection only ever needs the comment; stage data is validated for
/// approvals alone.
pub fn validate(
    step: u8,
    decision: Decision,
    submission: &StageSubmission,
) -> Result<(), WorkflowError> {
    stages::stage_at(step)?;

    let mut missing_fields = Vec::new();
    if is_blank(&submission.comment) {
        missing_fields.push("comment".to_string());
    }

    if decision == Decision::Approved {
        collect_stage_fields(step, &submission.data, &mut missing_fields);
    }

    if missing_fields.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::InvalidPayload { missing_fields })
    }
}

fn collect_stage_fields(step: u8, payload: &StagePayload, missing_fields: &mut Vec<String>) {
    if !payload.matches_step(step) {
        missing_fields
            .extend(StagePayload::required_fields_for(step).iter().map(ToString::to_string));
        return;
    }

    match payload {
        StagePayload::General => {}
        StagePayload::LeadAssignment { initiative_lead } => {
            if is_blank(initiative_lead) {
                missing_fields.push("initiativeLead".to_string());
            }
        }
        StagePayload::MocAssessment { moc_required, moc_number } => match moc_required {
            None => missing_fields.push("mocRequired".to_string()),
            Some(true) => {
                if moc_number.as_deref().map_or(true, is_blank) {
                    missing_fields.push("mocNumber".to_string());
                }
            }
            Some(false) => {}
        },
        StagePayload::CapexAssessment { capex_required, capex_details } => match capex_required {
            None => missing_fields.push("capexRequired".to_string()),
            Some(true) => {
                if capex_details.as_deref().map_or(true, is_blank) {
                    missing_fields.push("capexDetails".to_string());
                }
            }
            Some(false) => {}
        },
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::domain::transaction::Decision;
    use crate::errors::WorkflowError;
    use crate::workflow::payload::{StagePayload, StageSubmission};

    fn missing(fields: &[&str]) -> WorkflowError {
        WorkflowError::missing(fields)
    }

    #[test]
    fn early_stages_need_only_a_comment() {
        for step in [1, 2] {
            assert_eq!(
                validate(step, Decision::Approved, &StageSubmission::general("looks good")),
                Ok(())
            );
        }
    }

    #[test]
    fn blank_comment_is_rejected_everywhere() {
        assert_eq!(
            validate(1, Decision::Approved, &StageSubmission::general("   ")),
            Err(missing(&["comment"]))
        );
        assert_eq!(
            validate(2, Decision::Rejected, &StageSubmission::general("")),
            Err(missing(&["comment"]))
        );
    }

    #[test]
    fn stage_three_requires_a_lead() {
        assert_eq!(
            validate(3, Decision::Approved, &StageSubmission::lead("ok", " ")),
            Err(missing(&["initiativeLead"]))
        );
        assert_eq!(
            validate(3, Decision::Approved, &StageSubmission::lead("ok", "il@example.com")),
            Ok(())
        );
    }

    #[test]
    fn stage_four_requires_the_moc_flag() {
        let submission = StageSubmission {
            comment: "assessed".to_string(),
            data: StagePayload::MocAssessment { moc_required: None, moc_number: None },
        };
        assert_eq!(
            validate(4, Decision::Approved, &submission),
            Err(missing(&["mocRequired"]))
        );
    }

    #[test]
    fn moc_number_is_required_when_moc_applies() {
        assert_eq!(
            validate(4, Decision::Approved, &StageSubmission::moc("assessed", true, None)),
            Err(missing(&["mocNumber"]))
        );
        assert_eq!(
            validate(4, Decision::Approved, &StageSubmission::moc("assessed", true, Some(" "))),
            Err(missing(&["mocNumber"]))
        );
        assert_eq!(
            validate(
                4,
                Decision::Approved,
                &StageSubmission::moc("assessed", true, Some("MOC-HSD1-2025-004"))
            ),
            Ok(())
        );
        assert_eq!(
            validate(4, Decision::Approved, &StageSubmission::moc("not needed", false, None)),
            Ok(())
        );
    }

    #[test]
    fn capex_details_are_required_when_capex_applies() {
        assert_eq!(
            validate(5, Decision::Approved, &StageSubmission::capex("assessed", true, None)),
            Err(missing(&["capexDetails"]))
        );
        assert_eq!(
            validate(
                5,
                Decision::Approved,
                &StageSubmission::capex("assessed", true, Some("New condensate pump, 1.2 Cr"))
            ),
            Ok(())
        );
        assert_eq!(
            validate(5, Decision::Approved, &StageSubmission::capex("not needed", false, None)),
            Ok(())
        );
    }

    #[test]
    fn mismatched_payload_reports_the_stage_fields() {
        assert_eq!(
            validate(3, Decision::Approved, &StageSubmission::general("ok")),
            Err(missing(&["initiativeLead"]))
        );
        assert_eq!(
            validate(4, Decision::Approved, &StageSubmission::general("ok")),
            Err(missing(&["mocRequired"]))
        );
    }

    #[test]
    fn every_failure_is_reported_in_one_response() {
        let submission = StageSubmission {
            comment: " ".to_string(),
            data: StagePayload::MocAssessment { moc_required: Some(true), moc_number: None },
        };
        assert_eq!(
            validate(4, Decision::Approved, &submission),
            Err(missing(&["comment", "mocNumber"]))
        );
    }

    #[test]
    fn rejection_ignores_stage_data() {
        assert_eq!(
            validate(4, Decision::Rejected, &StageSubmission::general("insufficient data")),
            Ok(())
        );
    }

    #[test]
    fn invalid_stage_is_surfaced() {
        assert_eq!(
            validate(0, Decision::Approved, &StageSubmission::general("ok")),
            Err(WorkflowError::InvalidStage(0))
        );
    }
}
