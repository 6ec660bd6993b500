use lira_core::{allowed_transitions, validate_transition, WorkflowError, WorkflowStep};
use proptest::prelude::*;

#[test]
fn test_input_transitions() {
    assert!(validate_transition(WorkflowStep::Input, WorkflowStep::Review).is_ok());

    // Nothing skips review
    assert!(validate_transition(WorkflowStep::Input, WorkflowStep::Approved).is_err());
    assert!(validate_transition(WorkflowStep::Input, WorkflowStep::Applied).is_err());
}

#[test]
fn test_review_transitions() {
    assert!(validate_transition(WorkflowStep::Review, WorkflowStep::Approved).is_ok());
    assert!(validate_transition(WorkflowStep::Review, WorkflowStep::Input).is_ok());
    assert!(validate_transition(WorkflowStep::Review, WorkflowStep::Applied).is_err());
}

#[test]
fn test_applied_only_restarts() {
    assert_eq!(allowed_transitions(WorkflowStep::Applied), &[WorkflowStep::Input]);
    assert!(validate_transition(WorkflowStep::Applied, WorkflowStep::Review).is_err());
}

#[test]
fn test_error_names_both_steps() {
    let err = validate_transition(WorkflowStep::Approved, WorkflowStep::Input).unwrap_err();
    assert_eq!(
        err,
        WorkflowError::IllegalTransition {
            from: WorkflowStep::Approved,
            to: WorkflowStep::Input,
        }
    );
    let message = err.to_string();
    assert!(message.contains("approved"));
    assert!(message.contains("input"));
}

#[test]
fn test_step_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&WorkflowStep::Review).unwrap(), "\"review\"");
    assert_eq!(WorkflowStep::default(), WorkflowStep::Input);
}

fn any_step() -> impl Strategy<Value = WorkflowStep> {
    prop_oneof![
        Just(WorkflowStep::Input),
        Just(WorkflowStep::Review),
        Just(WorkflowStep::Approved),
        Just(WorkflowStep::Applied),
    ]
}

proptest! {
    #[test]
    fn prop_validation_matches_allowed(from in any_step(), to in any_step()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        prop_assert_eq!(res.is_ok(), allowed.contains(&to));
    }

    #[test]
    fn prop_applied_reached_only_from_approved(from in any_step()) {
        let res = validate_transition(from, WorkflowStep::Applied);
        prop_assert_eq!(res.is_ok(), from == WorkflowStep::Approved);
    }

    #[test]
    fn prop_no_self_loops(step in any_step()) {
        prop_assert!(validate_transition(step, step).is_err());
    }
}
