use std::fmt;
use thiserror::Error;

/// States of the two-page questionnaire workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Page1Editing,
    Page1Validated,
    Page2Editing,
    Submitting,
    Submitted,
    SubmissionFailed,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal workflow transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

impl WorkflowState {
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [WorkflowState] {
        use WorkflowState::{
            Page1Editing, Page1Validated, Page2Editing, SubmissionFailed, Submitted, Submitting,
        };
        match self {
            // Page2Editing directly: resuming a session whose stored page 1 validates.
            Page1Editing => &[Page1Validated, Page2Editing],
            Page1Validated => &[Page2Editing, Page1Editing],
            Page2Editing => &[Page1Editing, Submitting],
            Submitting => &[Submitted, SubmissionFailed],
            SubmissionFailed => &[Submitting, Page2Editing, Page1Editing],
            Submitted => &[],
        }
    }

    /// # Errors
    ///
    /// Returns `IllegalTransition` if `to` is not reachable from `self`.
    pub fn check_transition(self, to: WorkflowState) -> Result<(), IllegalTransition> {
        if self.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(IllegalTransition { from: self, to })
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Page1Editing => "page1-editing",
            WorkflowState::Page1Validated => "page1-validated",
            WorkflowState::Page2Editing => "page2-editing",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Submitted => "submitted",
            WorkflowState::SubmissionFailed => "submission-failed",
        };
        f.write_str(s)
    }
}
