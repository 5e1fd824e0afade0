use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use stress_core::model::{
    Member, MemberId, StressTestId, StressTestRecord, StressTestSubmission,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Search criteria for the results list. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StressTestFilter {
    /// Substring of the respondent name.
    pub name: Option<String>,
    pub member_id: Option<MemberId>,
    pub position: Option<String>,
    pub test_date: Option<String>,
}

impl StressTestFilter {
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Applies the filter in memory; SQL backends translate it instead.
    #[must_use]
    pub fn matches(&self, record: &StressTestRecord) -> bool {
        let name_ok = non_blank(self.name.as_deref())
            .is_none_or(|needle| record.respondent.name.contains(needle));
        let member_ok = self.member_id.is_none_or(|id| record.member_id == Some(id));
        let position_ok = non_blank(self.position.as_deref())
            .is_none_or(|needle| record.respondent.position.contains(needle));
        let date_ok =
            non_blank(self.test_date.as_deref()).is_none_or(|d| record.respondent.test_date == d);
        name_ok && member_ok && position_ok && date_ok
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Repository contract for submitted stress-test results.
#[async_trait]
pub trait StressTestRepository: Send + Sync {
    /// Persist a new result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn create_result(
        &self,
        submission: &StressTestSubmission,
    ) -> Result<StressTestId, StorageError>;

    /// Fetch a result by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: StressTestId) -> Result<StressTestRecord, StorageError>;

    /// List results matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(
        &self,
        filter: &StressTestFilter,
    ) -> Result<Vec<StressTestRecord>, StorageError>;

    /// Delete a result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_result(&self, id: StressTestId) -> Result<(), StorageError>;
}

/// Repository contract for the member lookup used to pre-fill respondents.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Persist or update a member.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the member cannot be stored.
    async fn upsert_member(&self, member: &Member) -> Result<(), StorageError>;

    /// Fetch a member by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_member(&self, id: MemberId) -> Result<Member, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<BTreeMap<StressTestId, StressTestRecord>>>,
    members: Arc<Mutex<HashMap<MemberId, Member>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StressTestRepository for InMemoryRepository {
    async fn create_result(
        &self,
        submission: &StressTestSubmission,
    ) -> Result<StressTestId, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = StressTestId::new(next);
        guard.insert(id, StressTestRecord::from_submission(id, submission));
        Ok(id)
    }

    async fn get_result(&self, id: StressTestId) -> Result<StressTestRecord, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        filter: &StressTestFilter,
    ) -> Result<Vec<StressTestRecord>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .rev()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn delete_result(&self, id: StressTestId) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl MemberRepository for InMemoryRepository {
    async fn upsert_member(&self, member: &Member) -> Result<(), StorageError> {
        let mut guard = self
            .members
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(member.id, member.clone());
        Ok(())
    }

    async fn get_member(&self, id: MemberId) -> Result<Member, StorageError> {
        let guard = self
            .members
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub stress_tests: Arc<dyn StressTestRepository>,
    pub members: Arc<dyn MemberRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let stress_tests: Arc<dyn StressTestRepository> = Arc::new(repo.clone());
        let members: Arc<dyn MemberRepository> = Arc::new(repo);
        Self {
            stress_tests,
            members,
        }
    }
}
