use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{StudySetId, TermId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TermError {
    #[error("term text cannot be empty")]
    EmptyTerm,

    #[error("definition text cannot be empty")]
    EmptyDefinition,
}

//
// ─── TERM TYPES ────────────────────────────────────────────────────────────────
//

/// A term that has not been persisted yet.
///
/// Drafts are built from validated questions and handed to storage in order;
/// storage assigns the ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDraft {
    term: String,
    definition: String,
}

impl TermDraft {
    /// Creates a draft from question text and the text of its correct option.
    ///
    /// # Errors
    ///
    /// Returns `TermError` if either side is empty or whitespace-only.
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Result<Self, TermError> {
        let term = term.into();
        let definition = definition.into();
        if term.trim().is_empty() {
            return Err(TermError::EmptyTerm);
        }
        if definition.trim().is_empty() {
            return Err(TermError::EmptyDefinition);
        }
        Ok(Self {
            term: term.trim().to_owned(),
            definition: definition.trim().to_owned(),
        })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn assign_id(self, id: TermId, study_set_id: StudySetId) -> Term {
        Term {
            id,
            study_set_id,
            term: self.term,
            definition: self.definition,
        }
    }
}

/// One question/answer pair owned by a study set. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    id: TermId,
    study_set_id: StudySetId,
    term: String,
    definition: String,
}

impl Term {
    /// Rehydrate a term from storage.
    ///
    /// # Errors
    ///
    /// Returns `TermError` if the persisted text is empty.
    pub fn from_persisted(
        id: TermId,
        study_set_id: StudySetId,
        term: String,
        definition: String,
    ) -> Result<Self, TermError> {
        Ok(TermDraft::new(term, definition)?.assign_id(id, study_set_id))
    }

    #[must_use]
    pub fn id(&self) -> TermId {
        self.id
    }

    #[must_use]
    pub fn study_set_id(&self) -> StudySetId {
        self.study_set_id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
