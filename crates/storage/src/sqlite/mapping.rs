use study_core::model::{
    ProgressId, ProgressRecord, StudyMode, StudySet, StudySetId, Term, TermId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn study_set_id_from_i64(v: i64) -> Result<StudySetId, StorageError> {
    Ok(StudySetId::new(i64_to_u64("study_set_id", v)?))
}

pub(crate) fn term_id_from_i64(v: i64) -> Result<TermId, StorageError> {
    Ok(TermId::new(i64_to_u64("term_id", v)?))
}

pub(crate) fn progress_id_from_i64(v: i64) -> Result<ProgressId, StorageError> {
    Ok(ProgressId::new(i64_to_u64("progress_id", v)?))
}

pub(crate) fn map_term_row(row: &SqliteRow) -> Result<Term, StorageError> {
    Term::from_persisted(
        term_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        study_set_id_from_i64(row.try_get::<i64, _>("study_set_id").map_err(ser)?)?,
        row.try_get::<String, _>("term").map_err(ser)?,
        row.try_get::<String, _>("definition").map_err(ser)?,
    )
    .map_err(ser)
}

/// Builds a `StudySet` from its row plus the already mapped terms.
pub(crate) fn map_study_set_row(row: &SqliteRow, terms: Vec<Term>) -> Result<StudySet, StorageError> {
    StudySet::from_persisted(
        study_set_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
        terms,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let mode: StudyMode = row
        .try_get::<String, _>("mode")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let score_i64: i64 = row.try_get("score").map_err(ser)?;
    let score = u32::try_from(score_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score_i64}")))?;

    ProgressRecord::from_persisted(
        progress_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("user_id").map_err(ser)?,
        study_set_id_from_i64(row.try_get::<i64, _>("study_set_id").map_err(ser)?)?,
        mode,
        score,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
