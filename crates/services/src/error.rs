//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{ProgressError, StudySetError, TermError};
use study_core::quiz::QuizSchemaError;

/// Errors emitted by a `TextGenerator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("text generation is not configured")]
    Disabled,
    #[error("text generation returned an empty response")]
    EmptyResponse,
    #[error("text generation did not finish within {0:?}")]
    Timeout(Duration),
    #[error("text generation request failed with status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("text generation response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The upload itself is unusable; nothing external was called.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestShapeError {
    #[error("request is not valid upload JSON: {0}")]
    Malformed(String),
    #[error("no files were uploaded")]
    NoFiles,
    #[error("uploaded file is missing `{0}`")]
    MissingField(&'static str),
    #[error("file data is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("document is empty")]
    EmptyDocument,
    #[error("document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: usize, limit: usize },
}

/// Which side of the pipeline a generation failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    RequestShape,
    Generation,
    Storage,
}

/// Errors emitted by `StudySetOrchestrator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudySetGenerationError {
    #[error(transparent)]
    RequestShape(#[from] RequestShapeError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no valid questions generated ({total_blocks} blocks returned)")]
    NoValidQuestions { total_blocks: usize },
    #[error("generated questions failed schema validation: {0}")]
    Schema(#[from] QuizSchemaError),
    #[error(transparent)]
    Term(#[from] TermError),
    #[error(transparent)]
    StudySet(#[from] StudySetError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StudySetGenerationError {
    /// Bucket used when reporting the failure to a caller.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::RequestShape(_) | Self::StudySet(_) => FailureCategory::RequestShape,
            Self::Generation(_) | Self::NoValidQuestions { .. } | Self::Schema(_) | Self::Term(_) => {
                FailureCategory::Generation
            }
            Self::Storage(_) => FailureCategory::Storage,
        }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AnswerChecker::judge`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerCheckError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
