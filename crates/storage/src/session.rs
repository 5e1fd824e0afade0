//! Per-device questionnaire state that survives navigation between pages.
//!
//! Each region lives under its own key. A region that cannot be decoded is
//! logged and reported as absent, so a damaged value never blocks the form.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use stress_core::model::{AnswerSet, MemberId, Page, RespondentInfo};
use tracing::{debug, warn};

use crate::kv::{InMemoryKeyValueStore, KeyValueStore};
use crate::repository::StorageError;

/// Named slots of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionRegion {
    SelectedMember,
    Page1Answers,
    Page2Answers,
    RespondentInfo,
}

impl SessionRegion {
    pub const ALL: [SessionRegion; 4] = [
        SessionRegion::SelectedMember,
        SessionRegion::Page1Answers,
        SessionRegion::Page2Answers,
        SessionRegion::RespondentInfo,
    ];

    /// Storage key, shared with the browser console's local storage layout.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            SessionRegion::SelectedMember => "selectedMemberId",
            SessionRegion::Page1Answers => "stressTestPage1Answers",
            SessionRegion::Page2Answers => "stressTestPage2Answers",
            SessionRegion::RespondentInfo => "stressTestUserInfo",
        }
    }

    #[must_use]
    pub fn for_page(page: Page) -> Self {
        match page {
            Page::One => SessionRegion::Page1Answers,
            Page::Two => SessionRegion::Page2Answers,
        }
    }
}

/// Typed access to the session regions over any `KeyValueStore`.
#[derive(Clone)]
pub struct SessionStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    // ─── Respondent ─────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    pub fn save_respondent(&self, info: &RespondentInfo) -> Result<(), StorageError> {
        self.save_json(SessionRegion::RespondentInfo, info)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn load_respondent(&self) -> Result<Option<RespondentInfo>, StorageError> {
        self.load_json(SessionRegion::RespondentInfo)
    }

    // ─── Answers ────────────────────────────────────────────────────────────

    /// Overwrites the stored answers for `page`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    pub fn save_answers(&self, page: Page, answers: &AnswerSet) -> Result<(), StorageError> {
        self.save_json(SessionRegion::for_page(page), answers)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn load_answers(&self, page: Page) -> Result<Option<AnswerSet>, StorageError> {
        self.load_json(SessionRegion::for_page(page))
    }

    /// Page 1 and page 2 answers combined. Page 1 wins on a shared key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn merge_all(&self) -> Result<AnswerSet, StorageError> {
        let first = self.load_answers(Page::One)?.unwrap_or_default();
        let second = self.load_answers(Page::Two)?.unwrap_or_default();
        Ok(AnswerSet::merge_pages(&first, &second))
    }

    // ─── Selected member ────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    pub fn save_selected_member(&self, id: MemberId) -> Result<(), StorageError> {
        self.kv
            .set(SessionRegion::SelectedMember.key(), id.value().to_string())
    }

    /// The member chosen before the questionnaire started, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn load_selected_member(&self) -> Result<Option<MemberId>, StorageError> {
        let key = SessionRegion::SelectedMember.key();
        let Some(raw) = self.kv.get(key)? else {
            return Ok(None);
        };
        match raw.parse::<MemberId>() {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                warn!(key, value = %raw, error = %err, "ignoring unreadable session region");
                Ok(None)
            }
        }
    }

    /// Removes every region in one backend operation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let keys = SessionRegion::ALL.map(SessionRegion::key);
        self.kv.remove_many(&keys)?;
        debug!("cleared questionnaire session state");
        Ok(())
    }

    fn save_json<T: Serialize>(&self, region: SessionRegion, value: &T) -> Result<(), StorageError> {
        let body =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(region.key(), body)
    }

    fn load_json<T: DeserializeOwned>(
        &self,
        region: SessionRegion,
    ) -> Result<Option<T>, StorageError> {
        let key = region.key();
        let Some(raw) = self.kv.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, error = %err, "ignoring unreadable session region");
                Ok(None)
            }
        }
    }
}
