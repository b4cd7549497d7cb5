use study_core::model::{StudySet, StudySetId, Term};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_study_set_row, map_term_row, ser, study_set_id_from_i64,
    term_id_from_i64,
};
use crate::repository::{NewStudySetRecord, StorageError, StudySetRepository};

#[async_trait::async_trait]
impl StudySetRepository for SqliteRepository {
    async fn create_study_set(&self, record: NewStudySetRecord) -> Result<StudySet, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO study_sets (title, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ",
        )
        .bind(record.title.as_str())
        .bind(record.description.as_deref())
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let set_id = study_set_id_from_i64(res.last_insert_rowid())?;
        let set_id_i64 = id_to_i64("study_set_id", set_id.value())?;

        let mut terms = Vec::with_capacity(record.terms.len());
        for (position, draft) in record.terms.into_iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("term position overflow".into()))?;
            let res = sqlx::query(
                r"
                INSERT INTO terms (study_set_id, position, term, definition)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(set_id_i64)
            .bind(position)
            .bind(draft.term())
            .bind(draft.definition())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            terms.push(draft.assign_id(term_id_from_i64(res.last_insert_rowid())?, set_id));
        }

        tx.commit().await.map_err(conn)?;

        StudySet::from_persisted(
            set_id,
            record.title,
            record.description,
            record.created_at,
            record.created_at,
            terms,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get_study_set(&self, id: StudySetId) -> Result<StudySet, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, created_at, updated_at
            FROM study_sets WHERE id = ?1
            ",
        )
        .bind(id_to_i64("study_set_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        self.hydrate(&row).await
    }

    async fn list_study_sets(&self, limit: u32) -> Result<Vec<StudySet>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, created_at, updated_at
            FROM study_sets
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sets = Vec::with_capacity(rows.len());
        for row in &rows {
            sets.push(self.hydrate(row).await?);
        }
        Ok(sets)
    }
}

impl SqliteRepository {
    async fn hydrate(&self, row: &SqliteRow) -> Result<StudySet, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;
        let terms = self.terms_for(id).await?;
        map_study_set_row(row, terms)
    }

    async fn terms_for(&self, study_set_id: i64) -> Result<Vec<Term>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, study_set_id, term, definition
            FROM terms
            WHERE study_set_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(study_set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_term_row).collect()
    }
}
