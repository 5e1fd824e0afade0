use stress_core::model::{StressTestId, StressTestRecord, StressTestSubmission};

use super::SqliteRepository;
use super::mapping::{map_stress_test_row, member_id_to_i64, ser};
use crate::repository::{StorageError, StressTestFilter, StressTestRepository, non_blank};

const SELECT_COLUMNS: &str = r"
    SELECT id, member_id, respondent_name, position, test_date,
           a_score, b_score, c_score, d_score, total_score, answers, created_at
    FROM stress_tests
";

#[async_trait::async_trait]
impl StressTestRepository for SqliteRepository {
    async fn create_result(
        &self,
        submission: &StressTestSubmission,
    ) -> Result<StressTestId, StorageError> {
        let answers = serde_json::to_string(&submission.answers).map_err(ser)?;
        let member_id = submission.member_id.map(member_id_to_i64).transpose()?;
        let scores = submission.scores;

        let res = sqlx::query(
            r"
            INSERT INTO stress_tests (
                member_id, respondent_name, position, test_date,
                a_score, b_score, c_score, d_score, total_score, answers, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(member_id)
        .bind(submission.respondent.name.as_str())
        .bind(submission.respondent.position.as_str())
        .bind(submission.respondent.test_date.as_str())
        .bind(i64::from(scores.a_score()))
        .bind(i64::from(scores.b_score()))
        .bind(i64::from(scores.c_score()))
        .bind(i64::from(scores.d_score()))
        .bind(i64::from(scores.total_score()))
        .bind(answers)
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(StressTestId::new(res.last_insert_rowid()))
    }

    async fn get_result(&self, id: StressTestId) -> Result<StressTestRecord, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_stress_test_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_results(
        &self,
        filter: &StressTestFilter,
    ) -> Result<Vec<StressTestRecord>, StorageError> {
        // NULL parameters disable their clause.
        let sql = format!(
            r"{SELECT_COLUMNS}
            WHERE (?1 IS NULL OR instr(respondent_name, ?1) > 0)
              AND (?2 IS NULL OR member_id = ?2)
              AND (?3 IS NULL OR instr(position, ?3) > 0)
              AND (?4 IS NULL OR test_date = ?4)
            ORDER BY created_at DESC, id DESC
            "
        );
        let member_id = filter.member_id.map(member_id_to_i64).transpose()?;
        let rows = sqlx::query(&sql)
            .bind(non_blank(filter.name.as_deref()))
            .bind(member_id)
            .bind(non_blank(filter.position.as_deref()))
            .bind(non_blank(filter.test_date.as_deref()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_stress_test_row(&row)?);
        }
        Ok(records)
    }

    async fn delete_result(&self, id: StressTestId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM stress_tests WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
