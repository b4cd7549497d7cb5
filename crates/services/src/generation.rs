use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::GenerationError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 200;

/// A document attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Everything a generator needs for one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    pub document: Option<Document>,
}

impl GenerationRequest {
    #[must_use]
    pub fn text(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
            document: None,
        }
    }

    #[must_use]
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }
}

/// Produces free text for a prompt, optionally grounded in a document.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` when the backend is unavailable or replies
    /// with nothing usable.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenerationConfig {
    /// `None` when `STUDY_AI_API_KEY` is unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("STUDY_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("STUDY_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// `TextGenerator` backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    client: Client,
    config: Option<GenerationConfig>,
}

impl ChatCompletionsGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GenerationConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn post_with_retry(
        &self,
        config: &GenerationConfig,
        payload: &ChatRequest,
    ) -> Result<ChatResponse, GenerationError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&config.api_key)
                .json(payload)
                .send()
                .await;

            let err = match result {
                Ok(response) if response.status().is_success() => {
                    let bytes = response.bytes().await?;
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let err = GenerationError::HttpStatus { status, body };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => GenerationError::Http(e),
            };

            if attempt >= MAX_RETRIES {
                return Err(err);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS << attempt);
            warn!(attempt, error = %err, "generation request failed, retrying");
            sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;
        let payload = ChatRequest::from_generation(&config.model, request);

        debug!(model = %config.model, "sending chat completion");
        let body = self.post_with_retry(config, &payload).await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(content.trim().to_owned())
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// `data:<mime>;base64,<payload>` form used for inline attachments.
fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

impl ChatRequest {
    fn from_generation(model: &str, request: GenerationRequest) -> Self {
        let user = match request.document {
            None => MessageContent::Text(request.user_prompt),
            Some(document) => {
                let attachment = if document.mime_type.starts_with("image/") {
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: to_data_url(&document.mime_type, &document.bytes),
                        },
                    }
                } else {
                    ContentPart::File {
                        file: FileData {
                            filename: document.file_name,
                            file_data: to_data_url(&document.mime_type, &document.bytes),
                        },
                    }
                };
                MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: request.user_prompt,
                    },
                    attachment,
                ])
            }
        };

        Self {
            model: model.to_owned(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_instruction),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileData },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct FileData {
    filename: String,
    file_data: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
