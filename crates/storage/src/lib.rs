#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, NewStudySetRecord, ProgressQuery, ProgressRepository, Storage,
    StorageError, StudySetRepository,
};
