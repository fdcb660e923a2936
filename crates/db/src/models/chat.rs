use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A conversation with the assistant, owned by one user of one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub user_id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Chat {
    pub const COLLECTION: &'static str = "chats";
    pub const DEFAULT_TITLE: &'static str = "New Chat";
    /// Titles derived from a first message are cut to this many characters.
    pub const TITLE_FROM_MESSAGE_CHARS: usize = 50;

    pub fn new(company_id: ObjectId, user_id: ObjectId, title: Option<String>) -> Self {
        let now = DateTime::now();
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_TITLE.to_string());
        Self {
            id: None,
            company_id,
            user_id,
            title,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn title_from_message(content: &str) -> String {
        let trimmed = content.trim();
        let mut chars = trimmed.chars();
        let head: String = chars.by_ref().take(Self::TITLE_FROM_MESSAGE_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}
