use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use stress_core::model::{
    AnswerSet, Member, MemberId, RespondentInfo, ScoreTuple, StressTestId, StressTestRecord,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn member_id_from_i64(v: i64) -> Result<MemberId, StorageError> {
    u64::try_from(v)
        .map(MemberId::new)
        .map_err(|_| StorageError::Serialization("member_id sign overflow".into()))
}

pub(crate) fn member_id_to_i64(id: MemberId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("member_id overflow".into()))
}

fn score_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_member_row(row: &SqliteRow) -> Result<Member, StorageError> {
    Ok(Member::new(
        member_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("occupation").map_err(ser)?,
    ))
}

pub(crate) fn map_stress_test_row(row: &SqliteRow) -> Result<StressTestRecord, StorageError> {
    let scores = ScoreTuple::from_persisted(
        score_from_i64("a_score", row.try_get("a_score").map_err(ser)?)?,
        score_from_i64("b_score", row.try_get("b_score").map_err(ser)?)?,
        score_from_i64("c_score", row.try_get("c_score").map_err(ser)?)?,
        score_from_i64("d_score", row.try_get("d_score").map_err(ser)?)?,
        score_from_i64("total_score", row.try_get("total_score").map_err(ser)?)?,
    )
    .map_err(ser)?;

    let answers_raw: String = row.try_get("answers").map_err(ser)?;
    let answers: AnswerSet = serde_json::from_str(&answers_raw).map_err(ser)?;

    Ok(StressTestRecord {
        id: StressTestId::new(row.try_get("id").map_err(ser)?),
        member_id: row
            .try_get::<Option<i64>, _>("member_id")
            .map_err(ser)?
            .map(member_id_from_i64)
            .transpose()?,
        respondent: RespondentInfo::new(
            row.try_get::<String, _>("respondent_name").map_err(ser)?,
            row.try_get::<String, _>("position").map_err(ser)?,
            row.try_get::<String, _>("test_date").map_err(ser)?,
        ),
        scores,
        answers,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
