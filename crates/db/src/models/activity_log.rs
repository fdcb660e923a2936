use bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Append-only record of one action by one actor inside one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    /// Absent when the actor could not be identified (e.g. unknown login email).
    pub user_id: Option<ObjectId>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub endpoint: Option<String>,
    pub status_code: Option<i32>,
    #[serde(default)]
    pub metadata: Document,
    pub success: bool,
    pub error_msg: Option<String>,
    pub timestamp: DateTime,
}

impl ActivityLog {
    pub const COLLECTION: &'static str = "activity_logs";

    pub fn new(
        company_id: ObjectId,
        user_id: Option<ObjectId>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        let action = action.into();
        let resource = resource.into();
        Self {
            id: None,
            company_id,
            user_id,
            description: format!("{action} {resource}"),
            action,
            resource,
            resource_id: None,
            ip_address: None,
            user_agent: None,
            method: None,
            endpoint: None,
            status_code: None,
            metadata: Document::new(),
            success: true,
            error_msg: None,
            timestamp: DateTime::now(),
        }
    }

    pub fn with_resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_request(mut self, method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Records the response status; 2xx and 3xx count as success.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(i32::from(status));
        self.success = (200..400).contains(&status);
        self
    }

    pub fn with_metadata(mut self, metadata: Document) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error_msg = Some(error.into());
        self
    }
}

/// Action verbs.
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const FAILED_LOGIN: &str = "failed_login";

    pub const CREATE_USER: &str = "create_user";
    pub const UPDATE_USER: &str = "update_user";
    pub const DEACTIVATE_USER: &str = "deactivate_user";
    pub const ACTIVATE_USER: &str = "activate_user";
    pub const ASSIGN_ROLE: &str = "assign_role";

    pub const CREATE_ROLE: &str = "create_role";
    pub const UPDATE_ROLE: &str = "update_role";
    pub const DELETE_ROLE: &str = "delete_role";

    pub const CREATE_CHAT: &str = "create_chat";
    pub const DELETE_CHAT: &str = "delete_chat";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const UPLOAD_DOCUMENT: &str = "upload_document";

    pub const UPDATE_SETTINGS: &str = "update_settings";
    pub const VIEW_ACTIVITY_LOGS: &str = "view_activity_logs";
    pub const VIEW_ANALYTICS: &str = "view_analytics";

    pub const CREATE_COMPANY: &str = "create_company";
    pub const UPDATE_COMPANY: &str = "update_company";

    pub const VIEW: &str = "view";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const UNKNOWN: &str = "unknown";
}

/// Resource types.
pub mod resources {
    pub const USER: &str = "user";
    pub const COMPANY: &str = "company";
    pub const ROLE: &str = "role";
    pub const CHAT: &str = "chat";
    pub const MESSAGE: &str = "message";
    pub const DOCUMENT: &str = "document";
    pub const SETTINGS: &str = "settings";
    pub const ACTIVITY: &str = "activity";
    pub const UNKNOWN: &str = "unknown";
}
