use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use storage::repository::{NewStudySetRecord, StudySetRepository};
use study_core::model::{StudySet, StudySetId, TermDraft};
use study_core::quiz::{
    BLOCK_SEPARATOR, ParsedQuestion, QuestionValidator, ValidatedQuestion, parse_response,
};

use crate::Clock;
use crate::config::StudyConfig;
use crate::error::{GenerationError, RequestShapeError, StudySetGenerationError};
use crate::generation::{Document, GenerationRequest, TextGenerator};

const DEFAULT_MIME_TYPE: &str = "application/pdf";

const SYSTEM_INSTRUCTION: &str = "You are a teacher. Your job is to take a document, and create a \
multiple choice test based on the content of the document. Each option should be roughly equal in \
length. Make sure to include a mix of easy, medium, and hard questions.";

/// One uploaded file as it arrives from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    /// `data:<mime>;base64,<payload>` or bare base64.
    pub data: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Upload payload; only the first file is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateStudySetRequest {
    pub files: Vec<UploadedFile>,
}

impl GenerateStudySetRequest {
    /// Parses the JSON array of files the upload form sends.
    ///
    /// # Errors
    ///
    /// Returns `RequestShapeError::Malformed` when the JSON does not describe a
    /// list of files with `name` and `data`.
    pub fn from_json(raw: &str) -> Result<Self, RequestShapeError> {
        let files: Vec<UploadedFile> =
            serde_json::from_str(raw).map_err(|e| RequestShapeError::Malformed(e.to_string()))?;
        Ok(Self { files })
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStudySet {
    pub questions: Vec<ValidatedQuestion>,
    pub study_set_id: StudySetId,
    /// Raw blocks in the generated text, valid or not.
    pub total_blocks: usize,
}

/// Validated upload, ready to hand to the generator.
#[derive(Debug)]
struct PreparedUpload {
    title: String,
    document: Document,
}

/// Generate → parse → validate → persist.
#[derive(Clone)]
pub struct StudySetOrchestrator {
    clock: Clock,
    config: StudyConfig,
    generator: Arc<dyn TextGenerator>,
    study_sets: Arc<dyn StudySetRepository>,
}

impl StudySetOrchestrator {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: StudyConfig,
        generator: Arc<dyn TextGenerator>,
        study_sets: Arc<dyn StudySetRepository>,
    ) -> Self {
        Self {
            clock,
            config,
            generator,
            study_sets,
        }
    }

    /// Turns an uploaded document into a persisted study set.
    ///
    /// Nothing is stored unless at least one question survives validation.
    ///
    /// # Errors
    ///
    /// See `StudySetGenerationError::category` for how failures are grouped.
    pub async fn generate(
        &self,
        request: &GenerateStudySetRequest,
    ) -> Result<GeneratedStudySet, StudySetGenerationError> {
        let upload = self.prepare(request)?;
        info!(
            file = %upload.title,
            bytes = upload.document.bytes.len(),
            mime = %upload.document.mime_type,
            "generating study set"
        );

        let text = self.call_generator(upload.document).await?;
        let outcome = parse_response(&text);
        let total_blocks = outcome.total_blocks;

        let accepted: Vec<ParsedQuestion> = outcome
            .questions
            .into_iter()
            .filter(QuestionValidator::accepts)
            .collect();
        debug!(total_blocks, accepted = accepted.len(), "parsed generated text");
        if accepted.len() < total_blocks {
            warn!(
                dropped = total_blocks - accepted.len(),
                total_blocks, "dropped malformed question blocks"
            );
        }
        if accepted.is_empty() {
            return Err(StudySetGenerationError::NoValidQuestions { total_blocks });
        }

        let questions = QuestionValidator::validate_batch(&accepted)?;
        let terms = questions
            .iter()
            .map(ValidatedQuestion::to_term_draft)
            .collect::<Result<Vec<TermDraft>, _>>()?;

        let record = NewStudySetRecord::new(upload.title, None, self.clock.now(), terms)?;
        let study_set = self.study_sets.create_study_set(record).await?;
        info!(
            study_set_id = %study_set.id(),
            terms = study_set.term_count(),
            "study set created"
        );

        Ok(GeneratedStudySet {
            questions,
            study_set_id: study_set.id(),
            total_blocks,
        })
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) when the set does not exist.
    pub async fn get_study_set(&self, id: StudySetId) -> Result<StudySet, StudySetGenerationError> {
        Ok(self.study_sets.get_study_set(id).await?)
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `StudySetGenerationError::Storage` if repository access fails.
    pub async fn list_study_sets(
        &self,
        limit: u32,
    ) -> Result<Vec<StudySet>, StudySetGenerationError> {
        Ok(self.study_sets.list_study_sets(limit).await?)
    }

    fn prepare(
        &self,
        request: &GenerateStudySetRequest,
    ) -> Result<PreparedUpload, RequestShapeError> {
        let file = request.files.first().ok_or(RequestShapeError::NoFiles)?;

        let title = file.name.trim();
        if title.is_empty() {
            return Err(RequestShapeError::MissingField("name"));
        }
        if file.data.trim().is_empty() {
            return Err(RequestShapeError::MissingField("data"));
        }

        let limit = self.config.max_document_bytes;
        let (embedded_mime, bytes) = decode_file_data(&file.data, limit)?;
        if bytes.is_empty() {
            return Err(RequestShapeError::EmptyDocument);
        }

        let mime_type = embedded_mime
            .or_else(|| file.mime_type.clone().filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_owned());

        Ok(PreparedUpload {
            title: title.to_owned(),
            document: Document {
                file_name: title.to_owned(),
                mime_type,
                bytes,
            },
        })
    }

    async fn call_generator(&self, document: Document) -> Result<String, GenerationError> {
        let user_prompt = format!(
            "Create a multiple choice test with as many questions as you can based on this \
document. Number each question, label the options a) to d), and mark the correct option by \
starting its text with [CORRECT]. After each question and its options, write '{BLOCK_SEPARATOR}' \
on a new line."
        );
        let request =
            GenerationRequest::text(SYSTEM_INSTRUCTION, user_prompt).with_document(document);

        let budget = self.config.generation_timeout;
        match tokio::time::timeout(budget, self.generator.generate(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => {
                warn!(error = %err, "generation failed");
                Err(err)
            }
            Err(_) => {
                warn!(?budget, "generation timed out");
                Err(GenerationError::Timeout(budget))
            }
        }
    }
}

/// Decodes `data:<mime>;base64,<payload>` or bare base64. Returns the MIME
/// type embedded in a data URL, if any.
///
/// The size limit is checked on the encoded length first, so oversized
/// uploads are never decoded.
fn decode_file_data(
    data: &str,
    limit: usize,
) -> Result<(Option<String>, Vec<u8>), RequestShapeError> {
    let data = data.trim();
    let (mime, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                RequestShapeError::InvalidEncoding("data URL has no payload".into())
            })?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                RequestShapeError::InvalidEncoding("data URL is not base64 encoded".into())
            })?;
            let mime = (!mime.is_empty()).then(|| mime.to_owned());
            (mime, payload)
        }
        None => (None, data),
    };

    let payload = payload.trim();
    let size = decoded_len(payload);
    if size > limit {
        return Err(RequestShapeError::DocumentTooLarge { size, limit });
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| RequestShapeError::InvalidEncoding(e.to_string()))?;
    if bytes.len() > limit {
        return Err(RequestShapeError::DocumentTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok((mime, bytes))
}

/// Byte length a padded base64 payload decodes to.
fn decoded_len(payload: &str) -> usize {
    let padding = payload.bytes().rev().take_while(|&b| b == b'=').count().min(2);
    (payload.len() / 4 * 3).saturating_sub(padding)
}
