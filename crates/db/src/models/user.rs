use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Fixed at creation; a user never moves between companies.
    pub company_id: ObjectId,
    /// Unique within the company.
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub name: String,
    pub role_id: ObjectId,
    /// Copy of the role's name, refreshed on role changes.
    pub role_name: String,
    /// Copy of the role's permissions, refreshed on role edits.
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub last_login_at: Option<DateTime>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub created_by: Option<ObjectId>,
}

fn bool_true() -> bool {
    true
}

impl User {
    pub const COLLECTION: &'static str = "users";
}
