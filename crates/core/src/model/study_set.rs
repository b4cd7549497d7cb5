use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{StudySetId, TermId};
use crate::model::term::Term;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySetError {
    #[error("study set title cannot be empty")]
    EmptyTitle,

    #[error("updated_at is before created_at")]
    InvalidTimeRange,

    #[error("term {term_id} belongs to study set {found}, expected {expected}")]
    ForeignTerm {
        term_id: TermId,
        expected: StudySetId,
        found: StudySetId,
    },
}

//
// ─── STUDY SET ─────────────────────────────────────────────────────────────────
//

/// A titled collection of terms generated from one uploaded document.
///
/// Terms keep the order in which their questions appeared in the generated
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySet {
    id: StudySetId,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    terms: Vec<Term>,
}

impl StudySet {
    /// Rehydrate a study set with its terms.
    ///
    /// # Errors
    ///
    /// Returns `StudySetError::EmptyTitle` for a blank title,
    /// `StudySetError::InvalidTimeRange` if `updated_at < created_at`, and
    /// `StudySetError::ForeignTerm` if a term points at another set.
    pub fn from_persisted(
        id: StudySetId,
        title: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        terms: Vec<Term>,
    ) -> Result<Self, StudySetError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(StudySetError::EmptyTitle);
        }
        if updated_at < created_at {
            return Err(StudySetError::InvalidTimeRange);
        }
        if let Some(term) = terms.iter().find(|t| t.study_set_id() != id) {
            return Err(StudySetError::ForeignTerm {
                term_id: term.id(),
                expected: id,
                found: term.study_set_id(),
            });
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            created_at,
            updated_at,
            terms,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> StudySetId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn term_ids(&self) -> Vec<TermId> {
        self.terms.iter().map(Term::id).collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
