use axum::{extract::State, http::StatusCode};
use bizchat_db::models::{
    User,
    activity_log::{actions, resources},
    role::permissions::RoleKind,
};
use bizchat_services::dao::{
    DaoError, PaginatedResult,
    activity_log::UserActivitySummary,
    user::{NewUser, UserStats, UserUpdate},
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ListQuery, audit_mutation, parse_id, timestamp};
use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo, Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub company_id: String,
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub role_id: String,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            company_id: user.company_id.to_hex(),
            email: user.email,
            username: user.username,
            name: user.name,
            role_id: user.role_id.to_hex(),
            role_name: user.role_name,
            permissions: user.permissions,
            is_super_admin: user.is_super_admin,
            is_active: user.is_active,
            avatar: user.avatar,
            phone: user.phone,
            department: user.department,
            position: user.position,
            last_login_at: user.last_login_at.map(timestamp),
            created_at: timestamp(user.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Defaults to the employee role.
    pub role_id: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(flatten)]
    pub profile: UserUpdate,
    pub role_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

impl DaysQuery {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(30).clamp(1, 365)
    }
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    body.validate()?;
    ensure_seat_available(&state, auth.company_id).await?;

    let role = match body.role_id.as_deref() {
        Some(raw) => {
            let role_id = parse_id(raw, "role_id")?;
            state
                .roles
                .find_in_company(auth.company_id, role_id)
                .await
                .map_err(|e| match e {
                    DaoError::NotFound => {
                        ApiError::BadRequest("Role does not exist in this company".to_string())
                    }
                    other => other.into(),
                })?
        }
        None => {
            state
                .roles
                .find_by_name(auth.company_id, RoleKind::Employee.name())
                .await?
        }
    };

    let password_hash = state.auth.hash_password(&body.password)?;
    let user = state
        .users
        .create(
            NewUser {
                company_id: auth.company_id,
                email: body.email,
                name: body.name,
                password_hash,
                username: body.username,
                phone: body.phone,
                department: body.department,
                position: body.position,
                is_super_admin: false,
                created_by: Some(auth.user_id),
            },
            &role,
        )
        .await?;

    if let Some(id) = user.id {
        audit_mutation(
            &state,
            &auth,
            &client,
            actions::CREATE_USER,
            resources::USER,
            id,
            format!("Created user {} with role {}", user.email, user.role_name),
        );
    }
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Active users may not exceed the company's `max_users`.
async fn ensure_seat_available(state: &AppState, company_id: ObjectId) -> Result<(), ApiError> {
    let company = state.companies.find_by_id(company_id).await?;
    let active = state.users.count_active(company_id).await?;
    if active >= u64::from(company.max_users) {
        return Err(ApiError::BadRequest(format!(
            "User limit of {} reached for this company",
            company.max_users
        )));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResult<UserResponse>>, ApiError> {
    let result = state
        .users
        .list(auth.company_id, query.search.as_deref(), &query.pagination())
        .await?;
    Ok(Json(result.map(UserResponse::from)))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_id(&user_id, "user_id")?;
    let user = state.users.find_in_company(auth.company_id, user_id).await?;
    Ok(Json(user.into()))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_id(&user_id, "user_id")?;
    if user_id == auth.user_id && body.profile.is_active == Some(false) {
        return Err(ApiError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let current = state.users.find_in_company(auth.company_id, user_id).await?;
    let reactivating = !current.is_active && body.profile.is_active == Some(true);
    let deactivating = current.is_active && body.profile.is_active == Some(false);
    if reactivating {
        ensure_seat_available(&state, auth.company_id).await?;
    }

    let role = match body.role_id.as_deref() {
        Some(raw) => {
            let role_id = parse_id(raw, "role_id")?;
            Some(state.roles.find_in_company(auth.company_id, role_id).await?)
        }
        None => None,
    };

    let user = state
        .users
        .update(auth.company_id, user_id, body.profile, role.as_ref())
        .await?;

    let (action, description) = match &role {
        Some(role) => (
            actions::ASSIGN_ROLE,
            format!("Assigned role {} to {}", role.name, user.email),
        ),
        None if reactivating => (
            actions::ACTIVATE_USER,
            format!("Reactivated user {}", user.email),
        ),
        None if deactivating => (
            actions::DEACTIVATE_USER,
            format!("Deactivated user {}", user.email),
        ),
        None => (actions::UPDATE_USER, format!("Updated user {}", user.email)),
    };
    audit_mutation(
        &state,
        &auth,
        &client,
        action,
        resources::USER,
        user_id,
        description,
    );
    Ok(Json(user.into()))
}

pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_id(&user_id, "user_id")?;
    let user = state
        .users
        .deactivate(auth.company_id, auth.user_id, user_id)
        .await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::DEACTIVATE_USER,
        resources::USER,
        user_id,
        format!("Deactivated user {}", user.email),
    );
    Ok(Json(user.into()))
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.users.stats(auth.company_id).await?))
}

pub async fn activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<UserActivitySummary>, ApiError> {
    let user_id = parse_id(&user_id, "user_id")?;
    state.users.find_in_company(auth.company_id, user_id).await?;
    let summary = state
        .activity_logs
        .user_summary(auth.company_id, user_id, query.days())
        .await?;
    Ok(Json(summary))
}
