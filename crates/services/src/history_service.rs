use std::sync::Arc;

use storage::repository::{StorageError, StressTestFilter, StressTestRepository};
use stress_core::model::{StressTestId, StressTestRecord};
use tracing::{info, warn};

use crate::error::HistoryError;

/// Listing and housekeeping over stored stress-test results.
#[derive(Clone)]
pub struct StressTestHistoryService {
    results: Arc<dyn StressTestRepository>,
}

impl StressTestHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn StressTestRepository>) -> Self {
        Self { results }
    }

    /// Results matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` for backend failures.
    pub async fn search(
        &self,
        filter: &StressTestFilter,
    ) -> Result<Vec<StressTestRecord>, HistoryError> {
        Ok(self.results.list_results(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::NotFound` if no result has this id.
    pub async fn get(&self, id: StressTestId) -> Result<StressTestRecord, HistoryError> {
        match self.results.get_result(id).await {
            Ok(record) => Ok(record),
            Err(StorageError::NotFound) => Err(HistoryError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the selected results and returns how many were removed.
    ///
    /// Ids that no longer exist are skipped. An empty selection does nothing.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on the first backend failure; results
    /// deleted before it stay deleted.
    pub async fn delete_selected(&self, ids: &[StressTestId]) -> Result<usize, HistoryError> {
        let mut deleted = 0;
        for &id in ids {
            match self.results.delete_result(id).await {
                Ok(()) => deleted += 1,
                Err(StorageError::NotFound) => warn!(%id, "skipping missing stress test"),
                Err(err) => return Err(err.into()),
            }
        }
        if deleted > 0 {
            info!(deleted, requested = ids.len(), "deleted stress test results");
        }
        Ok(deleted)
    }
}
