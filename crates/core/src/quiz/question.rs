use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{TermDraft, TermError};

/// Number of options every multiple-choice question carries.
pub const OPTION_COUNT: usize = 4;

/// Letter of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    /// Maps an upper-case letter to its option. Lower-case input is rejected.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    /// Zero-based position of the option.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Best-effort question recovered from generated text.
///
/// Nothing about its shape is guaranteed; `answer` is kept as a raw
/// character so the validator can judge input from any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: Option<char>,
}

/// A question that passed `QuestionValidator`: non-empty text, exactly four
/// options, and an answer letter pointing at one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedQuestion {
    question: String,
    options: [String; OPTION_COUNT],
    answer: AnswerLetter,
}

impl ValidatedQuestion {
    pub(crate) fn new(question: String, options: [String; OPTION_COUNT], answer: AnswerLetter) -> Self {
        Self {
            question,
            options,
            answer,
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> AnswerLetter {
        self.answer
    }

    /// Text of the option the answer letter points at.
    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.answer.index()]
    }

    /// Term/definition pair persisted for this question.
    ///
    /// # Errors
    ///
    /// Returns `TermError::EmptyDefinition` when the correct option is blank.
    pub fn to_term_draft(&self) -> Result<TermDraft, TermError> {
        TermDraft::new(self.question.as_str(), self.correct_option())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidatedQuestion {
        ValidatedQuestion::new(
            "What is 2+2?".into(),
            ["3".into(), "4".into(), "5".into(), "6".into()],
            AnswerLetter::B,
        )
    }

    #[test]
    fn letters_map_to_indices() {
        assert_eq!(AnswerLetter::from_char('A').map(AnswerLetter::index), Some(0));
        assert_eq!(AnswerLetter::from_char('D').map(AnswerLetter::index), Some(3));
        assert_eq!(AnswerLetter::from_char('d'), None);
        assert_eq!(AnswerLetter::from_char('E'), None);
    }

    #[test]
    fn term_uses_correct_option_as_definition() {
        let draft = sample().to_term_draft().unwrap();
        assert_eq!(draft.term(), "What is 2+2?");
        assert_eq!(draft.definition(), "4");
    }
}
