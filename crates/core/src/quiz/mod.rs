//! Turning generated quiz text into validated questions.

mod parser;
mod question;
mod validator;

pub use parser::{
    BLOCK_SEPARATOR, CORRECT_TAG, FALLBACK_ANSWER, ParseOutcome, parse_block, parse_response,
    split_blocks,
};
pub use question::{AnswerLetter, OPTION_COUNT, ParsedQuestion, ValidatedQuestion};
pub use validator::{QuestionRejection, QuestionValidator, QuizSchemaError};
