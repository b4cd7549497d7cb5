use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnswerCheckError;
use crate::generation::{GenerationRequest, TextGenerator};

const SYSTEM_INSTRUCTION: &str = "You are a teacher evaluating answers. Address the learner as \
\"you\", never as \"the student\".";

const LITERAL_EXPLANATION: &str =
    "The answer checker was unavailable, so the answers were compared literally.";

/// Outcome of comparing a submitted answer with the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerVerdict {
    pub is_correct: bool,
    pub explanation: String,
}

/// Judges free-text answers for the write and test modes.
#[derive(Clone)]
pub struct AnswerChecker {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerChecker {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Asks the generator whether the answers are equivalent.
    ///
    /// # Errors
    ///
    /// Returns `AnswerCheckError::Generation` if the generator call fails.
    pub async fn judge(
        &self,
        submitted: &str,
        reference: &str,
    ) -> Result<AnswerVerdict, AnswerCheckError> {
        let request = GenerationRequest::text(SYSTEM_INSTRUCTION, judge_prompt(submitted, reference));
        let reply = self.generator.generate(request).await?;
        Ok(interpret_reply(&reply))
    }

    /// Like `judge`, but never fails: a generator error degrades to a trimmed,
    /// case-insensitive comparison.
    pub async fn check(&self, submitted: &str, reference: &str) -> AnswerVerdict {
        match self.judge(submitted, reference).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, "answer check fell back to literal comparison");
                literal_verdict(submitted, reference)
            }
        }
    }
}

fn judge_prompt(submitted: &str, reference: &str) -> String {
    format!(
        "Compare the following answer to the correct answer and decide whether they are \
semantically equivalent or whether the answer shows understanding of the concept.\n\n\
Correct Answer: \"{reference}\"\n\
Your Answer: \"{submitted}\"\n\n\
Respond only with JSON in this format:\n\
{{\n  \"isCorrect\": true/false,\n  \"explanation\": \"Brief explanation of why the answer is correct or incorrect\"\n}}"
    )
}

/// Reads the generator reply. Non-JSON replies are accepted when they mention
/// `true` anywhere, and the whole reply becomes the explanation.
fn interpret_reply(reply: &str) -> AnswerVerdict {
    let body = strip_code_fence(reply);
    serde_json::from_str::<AnswerVerdict>(body).unwrap_or_else(|_| AnswerVerdict {
        is_correct: reply.to_lowercase().contains("true"),
        explanation: reply.to_owned(),
    })
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

fn literal_verdict(submitted: &str, reference: &str) -> AnswerVerdict {
    AnswerVerdict {
        is_correct: submitted.trim().to_lowercase() == reference.trim().to_lowercase(),
        explanation: LITERAL_EXPLANATION.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use async_trait::async_trait;

    struct Reply(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for Reply {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.0
                .map(str::to_owned)
                .map_err(|()| GenerationError::EmptyResponse)
        }
    }

    fn checker(reply: Result<&'static str, ()>) -> AnswerChecker {
        AnswerChecker::new(Arc::new(Reply(reply)))
    }

    #[tokio::test]
    async fn json_reply_is_used_verbatim() {
        let verdict = checker(Ok(r#"{"isCorrect": false, "explanation": "Different organelle."}"#))
            .check("ribosome", "mitochondria")
            .await;
        assert_eq!(
            verdict,
            AnswerVerdict {
                is_correct: false,
                explanation: "Different organelle.".into()
            }
        );
    }

    #[tokio::test]
    async fn fenced_json_reply_is_accepted() {
        let verdict = checker(Ok("```json\n{\"isCorrect\": true, \"explanation\": \"Same.\"}\n```"))
            .check("H2O", "water")
            .await;
        assert!(verdict.is_correct);
        assert_eq!(verdict.explanation, "Same.");
    }

    #[tokio::test]
    async fn prose_reply_looks_for_true() {
        let verdict = checker(Ok("isCorrect: TRUE, you got it"))
            .check("a", "b")
            .await;
        assert!(verdict.is_correct);
        assert_eq!(verdict.explanation, "isCorrect: TRUE, you got it");

        let verdict = checker(Ok("No, that is wrong.")).check("a", "b").await;
        assert!(!verdict.is_correct);
    }

    #[tokio::test]
    async fn generator_failure_degrades_to_literal_match() {
        let verdict = checker(Err(())).check("  Paris ", "paris").await;
        assert!(verdict.is_correct);
        assert_eq!(verdict.explanation, LITERAL_EXPLANATION);

        let verdict = checker(Err(())).check("Lyon", "Paris").await;
        assert!(!verdict.is_correct);
    }

    #[tokio::test]
    async fn judge_surfaces_generator_failure() {
        let err = checker(Err(())).judge("a", "a").await.unwrap_err();
        assert!(matches!(
            err,
            AnswerCheckError::Generation(GenerationError::EmptyResponse)
        ));
    }
}
