use axum::{extract::State, http::StatusCode};
use bizchat_db::models::{
    Role,
    activity_log::{actions, resources},
};
use bizchat_services::dao::role::{NewRole, RoleUpdate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{audit_mutation, parse_id, timestamp};
use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo, Json, Path},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub updated_at: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: role.name,
            display_name: role.display_name,
            description: role.description,
            permissions: role.permissions,
            is_system: role.is_system,
            updated_at: timestamp(role.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub role: RoleResponse,
    pub users_updated: u64,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RoleResponse>>, ApiError> {
    let roles = state.roles.list_by_company(auth.company_id).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(body): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    body.validate()?;
    let role = state
        .roles
        .create_custom(
            auth.company_id,
            NewRole {
                name: body.name,
                display_name: body.display_name,
                description: body.description,
                permissions: body.permissions,
            },
        )
        .await?;
    if let Some(id) = role.id {
        audit_mutation(
            &state,
            &auth,
            &client,
            actions::CREATE_ROLE,
            resources::ROLE,
            id,
            format!("Created role {}", role.name),
        );
    }
    Ok((StatusCode::CREATED, Json(role.into())))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(role_id): Path<String>,
    Json(body): Json<RoleUpdate>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role_id = parse_id(&role_id, "role_id")?;
    let role = state
        .roles
        .update_details(auth.company_id, role_id, body)
        .await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::UPDATE_ROLE,
        resources::ROLE,
        role_id,
        format!("Updated role {}", role.name),
    );
    Ok(Json(role.into()))
}

pub async fn update_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(role_id): Path<String>,
    Json(body): Json<PermissionsRequest>,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let role_id = parse_id(&role_id, "role_id")?;
    let (role, users_updated) = state
        .roles
        .update_permissions(auth.company_id, role_id, body.permissions)
        .await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::UPDATE_ROLE,
        resources::ROLE,
        role_id,
        format!(
            "Set {} permission(s) on role {} for {users_updated} user(s)",
            role.permissions.len(),
            role.name
        ),
    );
    Ok(Json(PermissionsResponse {
        role: role.into(),
        users_updated,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(role_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let role_id = parse_id(&role_id, "role_id")?;
    state.roles.delete(auth.company_id, role_id).await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::DELETE_ROLE,
        resources::ROLE,
        role_id,
        "Deleted role".to_string(),
    );
    Ok(StatusCode::NO_CONTENT)
}
