pub mod activity;
pub mod auth;
pub mod chat;
pub mod company;
pub mod role;
pub mod settings;
pub mod user;

use bizchat_db::models::ActivityLog;
use bizchat_services::dao::PaginationParams;
use bson::{DateTime, oid::ObjectId};
use serde::Deserialize;

use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo},
    state::AppState,
};

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

pub(crate) fn timestamp(value: DateTime) -> String {
    value.try_to_rfc3339_string().unwrap_or_default()
}

/// `?search=&page=&per_page=` for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListQuery {
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Explicit audit entry for a mutation, on top of the per-request one.
pub(crate) fn audit_mutation(
    state: &AppState,
    auth: &AuthUser,
    client: &ClientInfo,
    action: &str,
    resource: &str,
    resource_id: ObjectId,
    description: String,
) {
    state.audit.record(
        ActivityLog::new(auth.company_id, Some(auth.user_id), action, resource)
            .with_resource_id(resource_id.to_hex())
            .with_description(description)
            .with_client(client.ip.clone(), client.user_agent.clone()),
    );
}
