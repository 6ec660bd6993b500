//! Change workflow state machine

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// Step of the change workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    /// Composing a request
    #[default]
    Input,
    /// Proposal awaiting a decision
    Review,
    /// Proposal accepted, not yet written
    Approved,
    /// Proposal written and rewarded
    Applied,
}

impl WorkflowStep {
    /// All steps, in workflow order
    pub const ALL: [Self; 4] = [Self::Input, Self::Review, Self::Approved, Self::Applied];
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Applied => "applied",
        };
        f.write_str(name)
    }
}

/// Validates a workflow transition.
///
/// # Errors
/// Returns [`WorkflowError::IllegalTransition`] if `to` is not reachable
/// from `from` in one step
pub fn validate_transition(from: WorkflowStep, to: WorkflowStep) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Steps reachable from `from` in one transition
#[must_use]
pub fn allowed_transitions(from: WorkflowStep) -> &'static [WorkflowStep] {
    use WorkflowStep::{Applied, Approved, Input, Review};
    match from {
        Input => &[Review],
        Review => &[Approved, Input],
        Approved => &[Applied],
        Applied => &[Input],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        assert!(validate_transition(WorkflowStep::Input, WorkflowStep::Review).is_ok());
        assert!(validate_transition(WorkflowStep::Review, WorkflowStep::Approved).is_ok());
        assert!(validate_transition(WorkflowStep::Approved, WorkflowStep::Applied).is_ok());
        assert!(validate_transition(WorkflowStep::Applied, WorkflowStep::Input).is_ok());
    }

    #[test]
    fn no_write_without_approval() {
        assert!(validate_transition(WorkflowStep::Input, WorkflowStep::Applied).is_err());
        assert!(validate_transition(WorkflowStep::Review, WorkflowStep::Applied).is_err());
    }

    #[test]
    fn approved_cannot_be_rejected() {
        assert!(validate_transition(WorkflowStep::Approved, WorkflowStep::Input).is_err());
    }
}
