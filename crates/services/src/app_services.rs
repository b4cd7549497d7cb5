use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::answer_check::AnswerChecker;
use crate::config::StudyConfig;
use crate::error::AppServicesError;
use crate::generation::TextGenerator;
use crate::progress_service::ProgressService;
use crate::study_set_service::StudySetOrchestrator;

/// Assembles the app-facing services around one storage backend and one
/// text generator.
#[derive(Clone)]
pub struct AppServices {
    config: StudyConfig,
    study_sets: Arc<StudySetOrchestrator>,
    progress: Arc<ProgressService>,
    answers: Arc<AnswerChecker>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: StudyConfig,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config, generator))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: StudyConfig,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let study_sets = Arc::new(StudySetOrchestrator::new(
            clock,
            config.clone(),
            Arc::clone(&generator),
            Arc::clone(&storage.study_sets),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            config.user_id.as_str(),
            config.policy,
            Arc::clone(&storage.study_sets),
            Arc::clone(&storage.progress),
        ));
        let answers = Arc::new(AnswerChecker::new(generator));

        Self {
            config,
            study_sets,
            progress,
            answers,
        }
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    #[must_use]
    pub fn study_sets(&self) -> Arc<StudySetOrchestrator> {
        Arc::clone(&self.study_sets)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn answers(&self) -> Arc<AnswerChecker> {
        Arc::clone(&self.answers)
    }
}
