use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the results schema.
///
/// Version 1 creates members, stress-test results and their lookup indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS members (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    occupation TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // member_id is a soft reference: results may name members that only
        // exist in the remote console.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS stress_tests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    member_id INTEGER,
                    respondent_name TEXT NOT NULL,
                    position TEXT NOT NULL,
                    test_date TEXT NOT NULL,
                    a_score INTEGER NOT NULL CHECK (a_score >= 0),
                    b_score INTEGER NOT NULL CHECK (b_score >= 0),
                    c_score INTEGER NOT NULL CHECK (c_score >= 0),
                    d_score INTEGER NOT NULL CHECK (d_score >= 0),
                    total_score INTEGER NOT NULL
                        CHECK (total_score = a_score + b_score + c_score + d_score),
                    answers TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_stress_tests_member
                    ON stress_tests (member_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_stress_tests_test_date
                    ON stress_tests (test_date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
