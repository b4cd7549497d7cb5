use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ProgressId, StudySetId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("user id cannot be empty")]
    EmptyUserId,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown study mode: {raw}")]
pub struct ParseModeError {
    raw: String,
}

//
// ─── STUDY MODE ───────────────────────────────────────────────────────────────
//

/// Practice styles that report a score.
///
/// The overview and matching screens never submit progress, so they have no
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Flashcard,
    Quiz,
    Write,
    Test,
}

impl StudyMode {
    pub const ALL: [StudyMode; 4] = [
        StudyMode::Flashcard,
        StudyMode::Quiz,
        StudyMode::Write,
        StudyMode::Test,
    ];

    /// Stable storage/wire form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Flashcard => "flashcard",
            StudyMode::Quiz => "quiz",
            StudyMode::Write => "write",
            StudyMode::Test => "test",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flashcard" | "flashcards" => Ok(StudyMode::Flashcard),
            "quiz" => Ok(StudyMode::Quiz),
            "write" => Ok(StudyMode::Write),
            "test" => Ok(StudyMode::Test),
            _ => Err(ParseModeError { raw: s.to_owned() }),
        }
    }
}

//
// ─── PROGRESS RECORDS ─────────────────────────────────────────────────────────
//

/// A progress submission that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDraft {
    user_id: String,
    study_set_id: StudySetId,
    mode: StudyMode,
    score: u32,
    created_at: DateTime<Utc>,
}

impl ProgressDraft {
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyUserId` for a blank user id.
    pub fn new(
        user_id: impl Into<String>,
        study_set_id: StudySetId,
        mode: StudyMode,
        score: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ProgressError::EmptyUserId);
        }
        Ok(Self {
            user_id: user_id.trim().to_owned(),
            study_set_id,
            mode,
            score,
            created_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn study_set_id(&self) -> StudySetId {
        self.study_set_id
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn assign_id(self, id: ProgressId) -> ProgressRecord {
        ProgressRecord {
            id,
            user_id: self.user_id,
            study_set_id: self.study_set_id,
            mode: self.mode,
            score: self.score,
            created_at: self.created_at,
        }
    }
}

/// One completed practice session. Records are append-only; the current
/// standing for a mode is the newest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    id: ProgressId,
    user_id: String,
    study_set_id: StudySetId,
    mode: StudyMode,
    score: u32,
    created_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyUserId` for a blank user id.
    pub fn from_persisted(
        id: ProgressId,
        user_id: String,
        study_set_id: StudySetId,
        mode: StudyMode,
        score: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        Ok(ProgressDraft::new(user_id, study_set_id, mode, score, created_at)?.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> ProgressId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn study_set_id(&self) -> StudySetId {
        self.study_set_id
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
