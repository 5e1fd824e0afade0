#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod history_service;
pub mod member_lookup_service;
pub mod questionnaire;
pub mod submission_sink;

pub use stress_core::Clock;

pub use app_services::{AppConfig, AppServices};
pub use error::{AppServicesError, HistoryError, LookupError, SubmissionError, WorkflowError};
pub use history_service::StressTestHistoryService;
pub use member_lookup_service::MemberLookupService;
pub use questionnaire::{RestartReason, StressTestWorkflow, SubmissionReceipt, ValidationReport};
pub use submission_sink::{
    HttpSubmissionConfig, HttpSubmissionSink, RepositorySubmissionSink, SubmissionSink,
};
