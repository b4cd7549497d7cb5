#![forbid(unsafe_code)]

pub mod answer_check;
pub mod app_services;
pub mod config;
pub mod error;
pub mod generation;
pub mod progress_service;
pub mod study_set_service;

pub use study_core::Clock;

pub use answer_check::{AnswerChecker, AnswerVerdict};
pub use app_services::AppServices;
pub use config::StudyConfig;
pub use error::{
    AnswerCheckError, AppServicesError, FailureCategory, GenerationError, ProgressServiceError,
    RequestShapeError, StudySetGenerationError,
};
pub use generation::{
    ChatCompletionsGenerator, Document, GenerationConfig, GenerationRequest, TextGenerator,
};
pub use progress_service::{ProgressOverview, ProgressService};
pub use study_set_service::{
    GenerateStudySetRequest, GeneratedStudySet, StudySetOrchestrator, UploadedFile,
};
