//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use stress_core::model::{IllegalTransition, Ordinal, QuestionId, StressTestId, WorkflowState};

use crate::questionnaire::{RestartReason, ValidationReport};

/// Errors emitted by submission sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submission rejected{}: {message}", status_suffix(.status))]
    Rejected { status: Option<u16>, message: String },
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid submission endpoint: {0}")]
    InvalidEndpoint(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

/// Errors emitted by `StressTestWorkflow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error("page is incomplete: {0}")]
    Validation(ValidationReport),
    #[error("incomplete answers: {answered} of 20 answered")]
    IncompleteAnswers {
        answered: usize,
        unanswered: Vec<Ordinal>,
    },
    #[error("restart from page 1 required: {0}")]
    RestartRequired(RestartReason),
    #[error("question {question} is not on page {page}")]
    WrongPage { question: QuestionId, page: u8 },
    #[error("cannot {operation} while {state}")]
    NotEditable {
        operation: &'static str,
        state: WorkflowState,
    },
    #[error("result {id} was stored but the session could not be cleared: {source}")]
    ClearAfterSubmit {
        id: StressTestId,
        source: StorageError,
    },
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StressTestHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("stress test {0} not found")]
    NotFound(StressTestId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `MemberLookupService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LookupError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
