use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub chat_id: ObjectId,
    pub company_id: ObjectId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub model_used: Option<String>,
    /// Seconds spent waiting for the assistant.
    pub response_time: Option<f64>,
    pub timestamp: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub processed_text: Option<String>,
    pub uploaded_at: DateTime,
}

impl Message {
    pub const COLLECTION: &'static str = "messages";

    pub fn new(chat_id: ObjectId, company_id: ObjectId, role: MessageRole, content: String) -> Self {
        Self {
            id: None,
            chat_id,
            company_id,
            role,
            content,
            attachments: Vec::new(),
            model_used: None,
            response_time: None,
            timestamp: DateTime::now(),
        }
    }
}
