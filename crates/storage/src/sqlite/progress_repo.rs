use study_core::model::{ProgressDraft, ProgressRecord};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_progress_row, progress_id_from_i64};
use crate::repository::{ProgressQuery, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn append_progress(&self, draft: ProgressDraft) -> Result<ProgressRecord, StorageError> {
        let set_id = id_to_i64("study_set_id", draft.study_set_id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM study_sets WHERE id = ?1")
            .bind(set_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO progress (user_id, study_set_id, mode, score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(draft.user_id())
        .bind(set_id)
        .bind(draft.mode().as_str())
        .bind(i64::from(draft.score()))
        .bind(draft.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(draft.assign_id(progress_id_from_i64(res.last_insert_rowid())?))
    }

    async fn list_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, study_set_id, mode, score, created_at
            FROM progress
            WHERE study_set_id = ?1
              AND user_id = ?2
              AND (?3 IS NULL OR mode = ?3)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(id_to_i64("study_set_id", query.study_set_id.value())?)
        .bind(query.user_id.as_str())
        .bind(query.mode.map(|m| m.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}
