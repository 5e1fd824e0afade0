use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use storage::kv::{JsonFileKeyValueStore, KeyValueStore};
use storage::repository::Storage;
use storage::session::SessionStateStore;
use tracing::info;

use crate::Clock;
use crate::error::AppServicesError;
use crate::history_service::StressTestHistoryService;
use crate::member_lookup_service::MemberLookupService;
use crate::questionnaire::StressTestWorkflow;
use crate::submission_sink::{
    HttpSubmissionConfig, HttpSubmissionSink, RepositorySubmissionSink, SubmissionSink,
};

/// Where the pieces of the questionnaire live.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_url: String,
    /// `None` keeps the session in memory for the life of the process.
    pub session_file: Option<PathBuf>,
    /// When set, results are posted to the console backend instead of the
    /// local database.
    pub api: Option<HttpSubmissionConfig>,
    pub submit_timeout: Option<Duration>,
}

/// Assembles app-facing services over one storage backend and session store.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    session: SessionStateStore,
    sink: Arc<dyn SubmissionSink>,
    submit_timeout: Option<Duration>,
    members: Arc<MemberLookupService>,
    history: Arc<StressTestHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails, the session
    /// file cannot be opened, or the API base URL is invalid.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;

        let session = match &config.session_file {
            Some(path) => {
                let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileKeyValueStore::open(path)?);
                SessionStateStore::new(kv)
            }
            None => SessionStateStore::in_memory(),
        };

        let sink: Arc<dyn SubmissionSink> = match &config.api {
            Some(api) => {
                let sink = HttpSubmissionSink::new(api)?;
                info!(endpoint = %sink.endpoint(), "submitting results over http");
                Arc::new(sink)
            }
            None => Arc::new(RepositorySubmissionSink::new(Arc::clone(&storage.stress_tests))),
        };

        Ok(Self {
            clock,
            session,
            sink,
            submit_timeout: config.submit_timeout,
            members: Arc::new(MemberLookupService::new(Arc::clone(&storage.members))),
            history: Arc::new(StressTestHistoryService::new(Arc::clone(
                &storage.stress_tests,
            ))),
        })
    }

    /// A workflow over the shared session store.
    #[must_use]
    pub fn workflow(&self) -> StressTestWorkflow {
        let workflow =
            StressTestWorkflow::new(self.clock, self.session.clone(), Arc::clone(&self.sink))
                .with_member_lookup(self.members.as_ref().clone());
        match self.submit_timeout {
            Some(timeout) => workflow.with_submit_timeout(timeout),
            None => workflow,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStateStore {
        &self.session
    }

    #[must_use]
    pub fn members(&self) -> Arc<MemberLookupService> {
        Arc::clone(&self.members)
    }

    #[must_use]
    pub fn history(&self) -> Arc<StressTestHistoryService> {
        Arc::clone(&self.history)
    }
}
