mod ids;
mod progress;
mod study_set;
mod term;

pub use ids::{ParseIdError, ProgressId, StudySetId, TermId};

pub use progress::{ParseModeError, ProgressDraft, ProgressError, ProgressRecord, StudyMode};
pub use study_set::{StudySet, StudySetError};
pub use term::{Term, TermDraft, TermError};
