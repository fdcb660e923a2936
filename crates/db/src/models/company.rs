use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Lowercase slug; immutable once the company exists.
    pub domain: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    #[serde(default)]
    pub settings: CompanySettings,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub created_by: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Premium,
    Enterprise,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanySettings {
    #[serde(default)]
    pub allow_user_registration: bool,
    #[serde(default)]
    pub require_email_verification: bool,
    /// Minutes.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u32,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default = "default_max_chats_per_user")]
    pub max_chats_per_user: u32,
    #[serde(default = "default_max_messages_per_chat")]
    pub max_messages_per_chat: u32,
    #[serde(default = "bool_true")]
    pub enable_document_upload: bool,
    /// Bytes.
    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            allow_user_registration: false,
            require_email_verification: false,
            session_timeout: default_session_timeout(),
            allowed_domains: Vec::new(),
            max_chats_per_user: default_max_chats_per_user(),
            max_messages_per_chat: default_max_messages_per_chat(),
            enable_document_upload: true,
            max_document_size: default_max_document_size(),
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_max_users() -> u32 {
    10
}

fn default_session_timeout() -> u32 {
    60
}

fn default_max_chats_per_user() -> u32 {
    100
}

fn default_max_messages_per_chat() -> u32 {
    1000
}

fn default_max_document_size() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

impl Company {
    pub const COLLECTION: &'static str = "companies";
    pub const DEFAULT_MAX_USERS: u32 = 10;

    /// A freshly registered company on the free tier.
    pub fn new(name: String, domain: String, email: String) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            name,
            domain,
            email,
            phone: None,
            address: None,
            website: None,
            industry: None,
            subscription_tier: SubscriptionTier::Free,
            subscription_status: SubscriptionStatus::Active,
            max_users: Self::DEFAULT_MAX_USERS,
            settings: CompanySettings::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }
}
