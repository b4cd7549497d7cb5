use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use study_core::model::{
    ProgressDraft, ProgressId, ProgressRecord, StudyMode, StudySet, StudySetError, StudySetId,
    TermDraft, TermId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A study set that has not been persisted yet, with its terms in display
/// order. Ids for the set and each term are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewStudySetRecord {
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub terms: Vec<TermDraft>,
}

impl NewStudySetRecord {
    /// # Errors
    ///
    /// Returns `StudySetError::EmptyTitle` for a blank title.
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
        terms: Vec<TermDraft>,
    ) -> Result<Self, StudySetError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(StudySetError::EmptyTitle);
        }
        Ok(Self {
            title: title.trim().to_owned(),
            description,
            created_at,
            terms,
        })
    }
}

/// Filter for progress history reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressQuery {
    pub study_set_id: StudySetId,
    pub user_id: String,
    pub mode: Option<StudyMode>,
}

impl ProgressQuery {
    #[must_use]
    pub fn for_user(study_set_id: StudySetId, user_id: impl Into<String>) -> Self {
        Self {
            study_set_id,
            user_id: user_id.into(),
            mode: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Option<StudyMode>) -> Self {
        self.mode = mode;
        self
    }
}

/// Repository contract for study sets and their terms.
#[async_trait]
pub trait StudySetRepository: Send + Sync {
    /// Persist a set together with all of its terms. Either everything is
    /// stored or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn create_study_set(&self, record: NewStudySetRecord) -> Result<StudySet, StorageError>;

    /// Fetch a study set with its terms.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_study_set(&self, id: StudySetId) -> Result<StudySet, StorageError>;

    /// List study sets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failure.
    async fn list_study_sets(&self, limit: u32) -> Result<Vec<StudySet>, StorageError>;
}

/// Append-only progress history.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the study set does not exist.
    async fn append_progress(&self, draft: ProgressDraft) -> Result<ProgressRecord, StorageError>;

    /// Records matching the query, newest first (ties by descending id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failure.
    async fn list_progress(&self, query: &ProgressQuery)
    -> Result<Vec<ProgressRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    study_sets: Arc<Mutex<HashMap<StudySetId, StudySet>>>,
    progress: Arc<Mutex<Vec<ProgressRecord>>>,
    next_set_id: Arc<AtomicU64>,
    next_term_id: Arc<AtomicU64>,
    next_progress_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

fn newest_first_sets(a: &StudySet, b: &StudySet) -> std::cmp::Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| b.id().cmp(&a.id()))
}

#[async_trait]
impl StudySetRepository for InMemoryRepository {
    async fn create_study_set(&self, record: NewStudySetRecord) -> Result<StudySet, StorageError> {
        let id = StudySetId::new(next_id(&self.next_set_id));
        let terms = record
            .terms
            .into_iter()
            .map(|draft| draft.assign_id(TermId::new(next_id(&self.next_term_id)), id))
            .collect();
        let set = StudySet::from_persisted(
            id,
            record.title,
            record.description,
            record.created_at,
            record.created_at,
            terms,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut guard = self
            .study_sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(id, set.clone());
        Ok(set)
    }

    async fn get_study_set(&self, id: StudySetId) -> Result<StudySet, StorageError> {
        let guard = self
            .study_sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_study_sets(&self, limit: u32) -> Result<Vec<StudySet>, StorageError> {
        let guard = self
            .study_sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sets: Vec<StudySet> = guard.values().cloned().collect();
        sets.sort_by(newest_first_sets);
        sets.truncate(limit as usize);
        Ok(sets)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_progress(&self, draft: ProgressDraft) -> Result<ProgressRecord, StorageError> {
        {
            let sets = self
                .study_sets
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if !sets.contains_key(&draft.study_set_id()) {
                return Err(StorageError::NotFound);
            }
        }

        let record = draft.assign_id(ProgressId::new(next_id(&self.next_progress_id)));
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<ProgressRecord> = guard
            .iter()
            .filter(|r| r.study_set_id() == query.study_set_id && r.user_id() == query.user_id)
            .filter(|r| query.mode.is_none_or(|mode| r.mode() == mode))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(records)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub study_sets: Arc<dyn StudySetRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let study_sets: Arc<dyn StudySetRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            study_sets,
            progress,
        }
    }
}
