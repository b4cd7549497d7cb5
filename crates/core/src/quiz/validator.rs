use thiserror::Error;

use super::question::{AnswerLetter, OPTION_COUNT, ParsedQuestion, ValidatedQuestion};

/// Why a single question was turned away.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionRejection {
    #[error("question text is empty")]
    EmptyQuestion,

    #[error("expected 4 options, found {0}")]
    OptionCount(usize),

    #[error("answer is missing")]
    MissingAnswer,

    #[error("answer {0:?} is not one of A, B, C, D")]
    InvalidAnswer(char),
}

/// Whole-batch schema failure: the batch handed to persistence contained a
/// question that does not satisfy the question contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("question {index} failed validation: {reason}")]
pub struct QuizSchemaError {
    pub index: usize,
    #[source]
    pub reason: QuestionRejection,
}

/// Strict gate between parsed questions and persisted terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionValidator;

impl QuestionValidator {
    /// True iff the question has non-empty text, exactly four options and an
    /// answer in `A..=D`.
    #[must_use]
    pub fn accepts(question: &ParsedQuestion) -> bool {
        Self::validate(question).is_ok()
    }

    /// Checks one question and converts it into its validated form.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionRejection` that applies.
    pub fn validate(question: &ParsedQuestion) -> Result<ValidatedQuestion, QuestionRejection> {
        let text = question.question.trim();
        if text.is_empty() {
            return Err(QuestionRejection::EmptyQuestion);
        }

        let options: [String; OPTION_COUNT] = question
            .options
            .clone()
            .try_into()
            .map_err(|_| QuestionRejection::OptionCount(question.options.len()))?;

        let raw = question.answer.ok_or(QuestionRejection::MissingAnswer)?;
        let answer = AnswerLetter::from_char(raw).ok_or(QuestionRejection::InvalidAnswer(raw))?;

        Ok(ValidatedQuestion::new(text.to_owned(), options, answer))
    }

    /// Re-checks an already filtered batch before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns `QuizSchemaError` naming the first offending question.
    pub fn validate_batch(
        questions: &[ParsedQuestion],
    ) -> Result<Vec<ValidatedQuestion>, QuizSchemaError> {
        questions
            .iter()
            .enumerate()
            .map(|(index, q)| Self::validate(q).map_err(|reason| QuizSchemaError { index, reason }))
            .collect()
    }
}
