use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use storage::repository::{ProgressQuery, ProgressRepository, StudySetRepository};
use study_core::model::{ProgressDraft, ProgressRecord, StudyMode, StudySetId};
use study_core::{AggregationPolicy, ProgressAggregator};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Dashboard numbers for one study set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub overall: u32,
    pub mastered: u32,
    pub total_terms: usize,
    pub policy: AggregationPolicy,
}

/// Records practice sessions and summarises them.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    user_id: String,
    aggregator: ProgressAggregator,
    study_sets: Arc<dyn StudySetRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        user_id: impl Into<String>,
        policy: AggregationPolicy,
        study_sets: Arc<dyn StudySetRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            user_id: user_id.into(),
            aggregator: ProgressAggregator::new(policy),
            study_sets,
            progress,
        }
    }

    #[must_use]
    pub fn policy(&self) -> AggregationPolicy {
        self.aggregator.policy()
    }

    /// Append a finished session.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` with `NotFound` for an unknown
    /// study set, and `ProgressServiceError::Progress` if the configured user id
    /// is blank.
    pub async fn record(
        &self,
        study_set_id: StudySetId,
        mode: StudyMode,
        score: u32,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let draft = ProgressDraft::new(
            self.user_id.as_str(),
            study_set_id,
            mode,
            score,
            self.clock.now(),
        )?;
        let record = self.progress.append_progress(draft).await?;
        info!(
            study_set_id = %study_set_id,
            mode = %mode,
            score,
            progress_id = %record.id(),
            "progress recorded"
        );
        Ok(record)
    }

    /// Sessions for a set, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        study_set_id: StudySetId,
        mode: Option<StudyMode>,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let query = ProgressQuery::for_user(study_set_id, self.user_id.as_str()).with_mode(mode);
        Ok(self.progress.list_progress(&query).await?)
    }

    /// Score of the newest session in `mode`, used to resume where the
    /// learner left off.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn latest_score(
        &self,
        study_set_id: StudySetId,
        mode: StudyMode,
    ) -> Result<Option<u32>, ProgressServiceError> {
        let history = self.history(study_set_id, Some(mode)).await?;
        Ok(history.first().map(ProgressRecord::score))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` (with `NotFound` for an unknown
    /// set) if repository access fails.
    pub async fn overview(
        &self,
        study_set_id: StudySetId,
    ) -> Result<ProgressOverview, ProgressServiceError> {
        let study_set = self.study_sets.get_study_set(study_set_id).await?;
        let records = self.history(study_set_id, None).await?;
        let summary = self.aggregator.aggregate(&study_set.term_ids(), &records);

        Ok(ProgressOverview {
            overall: summary.overall,
            mastered: summary.mastered,
            total_terms: study_set.term_count(),
            policy: self.policy(),
        })
    }
}
