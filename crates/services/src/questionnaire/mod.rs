mod validation;
mod workflow;

// Public API of the questionnaire subsystem.
pub use crate::error::WorkflowError;
pub use validation::{RestartReason, ValidationReport};
pub use workflow::{StressTestWorkflow, SubmissionReceipt};
