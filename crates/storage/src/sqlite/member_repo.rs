use stress_core::model::{Member, MemberId};

use super::SqliteRepository;
use super::mapping::{map_member_row, member_id_to_i64};
use crate::repository::{MemberRepository, StorageError};

#[async_trait::async_trait]
impl MemberRepository for SqliteRepository {
    async fn upsert_member(&self, member: &Member) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO members (id, name, occupation)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                occupation = excluded.occupation
            ",
        )
        .bind(member_id_to_i64(member.id)?)
        .bind(member.name.as_str())
        .bind(member.occupation.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_member(&self, id: MemberId) -> Result<Member, StorageError> {
        let row = sqlx::query("SELECT id, name, occupation FROM members WHERE id = ?1")
            .bind(member_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_member_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
