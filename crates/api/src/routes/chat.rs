use axum::{extract::State, http::StatusCode};
use base64::Engine;
use bizchat_db::models::{Chat, Message, MessageRole};
use bizchat_services::chat::{DocumentUpload, Exchange};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{parse_id, timestamp};
use crate::{
    error::ApiError,
    extractors::{AuthUser, Json, Path},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: chat.title,
            is_archived: chat.is_archived,
            created_at: timestamp(chat.created_at),
            updated_at: timestamp(chat.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    pub attachments: Vec<AttachmentResponse>,
    pub model_used: Option<String>,
    pub response_time: Option<f64>,
    pub timestamp: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.map(|id| id.to_hex()).unwrap_or_default(),
            chat_id: message.chat_id.to_hex(),
            role: message.role,
            content: message.content,
            attachments: message
                .attachments
                .into_iter()
                .map(|a| AttachmentResponse {
                    filename: a.filename,
                    mime_type: a.mime_type,
                    size: a.size,
                })
                .collect(),
            model_used: message.model_used,
            response_time: message.response_time,
            timestamp: timestamp(message.timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub user_message: MessageResponse,
    pub assistant_message: MessageResponse,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            user_message: exchange.user_message.into(),
            assistant_message: exchange.assistant_message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub chat: ChatResponse,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameChatRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DocumentRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1))]
    pub mime_type: String,
    /// Standard base64 of the file contents.
    pub content_base64: String,
    pub prompt: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<CreateChatRequest>>,
) -> Result<(StatusCode, Json<ChatResponse>), ApiError> {
    let title = body.and_then(|Json(body)| body.title);
    let chat = state.chat.create_chat(&auth, title).await?;
    Ok((StatusCode::CREATED, Json(chat.into())))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    let chats = state
        .chats
        .list_for_user(auth.company_id, auth.user_id)
        .await?;
    Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatDetailResponse>, ApiError> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let chat = state
        .chats
        .find_owned(auth.company_id, auth.user_id, chat_id)
        .await?;
    let messages = state.chats.messages_for(chat_id).await?;
    Ok(Json(ChatDetailResponse {
        chat: chat.into(),
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

pub async fn messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    state
        .chats
        .find_owned(auth.company_id, auth.user_id, chat_id)
        .await?;
    let messages = state.chats.messages_for(chat_id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<RenameChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    body.validate()?;
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let chat = state
        .chats
        .rename(auth.company_id, auth.user_id, chat_id, &body.title)
        .await?;
    Ok(Json(chat.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let removed = state
        .chats
        .delete(auth.company_id, auth.user_id, chat_id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true, "messages_deleted": removed })))
}

/// Drops a chat that never received a message.
pub async fn cleanup(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let deleted = state
        .chats
        .cleanup_if_empty(auth.company_id, auth.user_id, chat_id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    body.validate()?;
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let exchange = state.chat.send_message(&auth, chat_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(exchange.into())))
}

pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<DocumentRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    body.validate()?;
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.content_base64.trim())
        .map_err(|_| ApiError::BadRequest("content_base64 is not valid base64".to_string()))?;

    let exchange = state
        .chat
        .process_document(
            &auth,
            chat_id,
            DocumentUpload {
                filename: body.filename,
                mime_type: body.mime_type,
                bytes,
                prompt: body.prompt,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(exchange.into())))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let message_id = parse_id(&message_id, "message_id")?;
    state
        .chats
        .find_owned(auth.company_id, auth.user_id, chat_id)
        .await?;
    state
        .chats
        .delete_message(auth.company_id, auth.user_id, message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
