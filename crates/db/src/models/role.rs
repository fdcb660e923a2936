use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use self::permissions::RoleKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    /// Unique within the company.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_system: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Role {
    pub const COLLECTION: &'static str = "roles";

    pub fn system(company_id: ObjectId, kind: RoleKind) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            company_id,
            name: kind.name().to_string(),
            display_name: kind.display_name().to_string(),
            description: Some(kind.description().to_string()),
            permissions: permissions::default_permissions(kind),
            is_system: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Permission tags (`resource:verb`) and the built-in role templates.
pub mod permissions {
    pub const MANAGE_COMPANIES: &str = "manage:companies";
    pub const VIEW_ALL_COMPANIES: &str = "view:all_companies";

    pub const MANAGE_USERS: &str = "manage:users";
    pub const VIEW_USERS: &str = "view:users";
    pub const MANAGE_ROLES: &str = "manage:roles";
    pub const VIEW_ROLES: &str = "view:roles";
    pub const MANAGE_COMPANY_SETTINGS: &str = "manage:company_settings";
    pub const VIEW_ACTIVITY_LOGS: &str = "view:activity_logs";
    pub const VIEW_ANALYTICS: &str = "view:analytics";

    pub const VIEW_TEAM_USERS: &str = "view:team_users";
    pub const VIEW_TEAM_ACTIVITY: &str = "view:team_activity";
    pub const MANAGE_TEAM_CHATS: &str = "manage:team_chats";

    pub const CREATE_CHAT: &str = "create:chat";
    pub const VIEW_OWN_CHATS: &str = "view:own_chats";
    pub const MANAGE_OWN_CHATS: &str = "manage:own_chats";
    pub const SEND_MESSAGES: &str = "send:messages";
    pub const UPLOAD_DOCUMENTS: &str = "upload:documents";
    pub const VIEW_OWN_PROFILE: &str = "view:own_profile";
    pub const EDIT_OWN_PROFILE: &str = "edit:own_profile";

    const PLATFORM: &[&str] = &[MANAGE_COMPANIES, VIEW_ALL_COMPANIES];

    const TENANT_ADMIN: &[&str] = &[
        MANAGE_USERS,
        VIEW_USERS,
        MANAGE_ROLES,
        VIEW_ROLES,
        MANAGE_COMPANY_SETTINGS,
        VIEW_ACTIVITY_LOGS,
        VIEW_ANALYTICS,
    ];

    const TEAM_LEAD: &[&str] = &[VIEW_TEAM_USERS, VIEW_TEAM_ACTIVITY, MANAGE_TEAM_CHATS];

    const BASIC: &[&str] = &[
        CREATE_CHAT,
        VIEW_OWN_CHATS,
        MANAGE_OWN_CHATS,
        SEND_MESSAGES,
        UPLOAD_DOCUMENTS,
        VIEW_OWN_PROFILE,
        EDIT_OWN_PROFILE,
    ];

    /// Each role kind's permissions, as the concatenation of its groups.
    static TEMPLATES: [(RoleKind, &[&[&str]]); 4] = [
        (RoleKind::SuperAdmin, &[PLATFORM, TENANT_ADMIN, BASIC]),
        (RoleKind::CompanyAdmin, &[TENANT_ADMIN, BASIC]),
        (RoleKind::Manager, &[TEAM_LEAD, BASIC]),
        (RoleKind::Employee, &[BASIC]),
    ];

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum RoleKind {
        SuperAdmin,
        CompanyAdmin,
        Manager,
        Employee,
    }

    impl RoleKind {
        /// The roles every company is created with.
        pub const SYSTEM: [RoleKind; 3] =
            [RoleKind::CompanyAdmin, RoleKind::Manager, RoleKind::Employee];

        pub fn name(self) -> &'static str {
            match self {
                RoleKind::SuperAdmin => "super_admin",
                RoleKind::CompanyAdmin => "company_admin",
                RoleKind::Manager => "manager",
                RoleKind::Employee => "employee",
            }
        }

        pub fn display_name(self) -> &'static str {
            match self {
                RoleKind::SuperAdmin => "Super Administrator",
                RoleKind::CompanyAdmin => "Company Administrator",
                RoleKind::Manager => "Manager",
                RoleKind::Employee => "Employee",
            }
        }

        pub fn description(self) -> &'static str {
            match self {
                RoleKind::SuperAdmin => "Platform-wide administration across all companies",
                RoleKind::CompanyAdmin => "Full access to company management, users, and settings",
                RoleKind::Manager => "Can view team members and their activities",
                RoleKind::Employee => "Standard user with basic chat access",
            }
        }

        pub fn from_name(name: &str) -> Option<Self> {
            [
                RoleKind::SuperAdmin,
                RoleKind::CompanyAdmin,
                RoleKind::Manager,
                RoleKind::Employee,
            ]
            .into_iter()
            .find(|kind| kind.name() == name)
        }
    }

    pub fn default_permissions(kind: RoleKind) -> Vec<String> {
        TEMPLATES
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, groups)| {
                groups
                    .iter()
                    .flat_map(|group| group.iter())
                    .map(|p| p.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Trims entries, drops empties and keeps the first occurrence of each tag.
    pub fn normalize<I, S>(permissions: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for p in permissions {
            let p = p.as_ref().trim();
            if !p.is_empty() && !out.iter().any(|existing| existing == p) {
                out.push(p.to_string());
            }
        }
        out
    }

    pub fn has(permissions: &[String], permission: &str) -> bool {
        permissions.iter().any(|p| p == permission)
    }

}
