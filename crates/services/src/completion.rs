use async_trait::async_trait;
use base64::Engine;
use bizchat_config::AiSettings;
use bizchat_db::models::MessageRole;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("AI service is not configured")]
    NotConfigured,
    #[error("Unsupported document type: {0}")]
    UnsupportedMedia(String),
    #[error("AI request failed: {0}")]
    Request(String),
    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Black-box text completion used by the chat endpoints.
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate_reply(
        &self,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, CompletionError>;

    async fn process_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, CompletionError>;
}

const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are a helpful assistant for business users. \
    Answer clearly and concisely, and say so when you are unsure.";

#[derive(Debug, Clone)]
pub struct ClaudeCompletion {
    client: Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContent {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

#[derive(Debug, Serialize)]
struct Base64Source {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

impl ClaudeCompletion {
    pub fn new(settings: &AiSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            endpoint: format!("{}/v1/messages", settings.base_url.trim_end_matches('/')),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn document_block(bytes: &[u8], mime_type: &str) -> Result<ClaudeContent, CompletionError> {
        let encode = || base64::engine::general_purpose::STANDARD.encode(bytes);
        match mime_type {
            "image/png" | "image/jpeg" | "image/gif" | "image/webp" => Ok(ClaudeContent::Image {
                source: Base64Source {
                    source_type: "base64",
                    media_type: mime_type.to_string(),
                    data: encode(),
                },
            }),
            "application/pdf" => Ok(ClaudeContent::Document {
                source: Base64Source {
                    source_type: "base64",
                    media_type: mime_type.to_string(),
                    data: encode(),
                },
            }),
            t if t.starts_with("text/") || t == "application/json" => Ok(ClaudeContent::Text {
                text: String::from_utf8_lossy(bytes).into_owned(),
            }),
            other => Err(CompletionError::UnsupportedMedia(other.to_string())),
        }
    }

    async fn send(&self, messages: Vec<ClaudeMessage>) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_ref().ok_or(CompletionError::NotConfigured)?;
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Claude API returned an error");
            return Err(CompletionError::Api { status, body });
        }

        let parsed: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        debug!(model = %self.model, chars = text.len(), "Claude reply received");
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for ClaudeCompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_reply(
        &self,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, CompletionError> {
        let mut messages: Vec<ClaudeMessage> = history
            .iter()
            .map(|turn| ClaudeMessage {
                role: Self::role(turn.role),
                content: vec![ClaudeContent::Text {
                    text: turn.content.clone(),
                }],
            })
            .collect();
        messages.push(ClaudeMessage {
            role: "user",
            content: vec![ClaudeContent::Text {
                text: new_message.to_string(),
            }],
        });
        self.send(messages).await
    }

    async fn process_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let document = Self::document_block(bytes, mime_type)?;
        let messages = vec![ClaudeMessage {
            role: "user",
            content: vec![
                document,
                ClaudeContent::Text {
                    text: prompt.to_string(),
                },
            ],
        }];
        self.send(messages).await
    }
}
