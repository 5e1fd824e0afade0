use std::sync::Arc;

use storage::repository::{MemberRepository, StorageError};
use stress_core::model::{Member, MemberId};
use tracing::debug;

use crate::error::LookupError;

/// Resolves member references used to pre-fill the respondent header.
#[derive(Clone)]
pub struct MemberLookupService {
    members: Arc<dyn MemberRepository>,
}

impl MemberLookupService {
    #[must_use]
    pub fn new(members: Arc<dyn MemberRepository>) -> Self {
        Self { members }
    }

    /// Looks up a member. A missing member is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Storage` for backend failures.
    pub async fn find(&self, id: MemberId) -> Result<Option<Member>, LookupError> {
        match self.members.get_member(id).await {
            Ok(member) => Ok(Some(member)),
            Err(StorageError::NotFound) => {
                debug!(%id, "member not found");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn missing_member_is_none() {
        let repo = InMemoryRepository::new();
        let member = Member::new(MemberId::new(1), "王小明", None);
        repo.upsert_member(&member).await.unwrap();

        let svc = MemberLookupService::new(Arc::new(repo));
        assert_eq!(svc.find(MemberId::new(1)).await.unwrap(), Some(member));
        assert_eq!(svc.find(MemberId::new(2)).await.unwrap(), None);
    }
}
