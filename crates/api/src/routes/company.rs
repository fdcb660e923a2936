use axum::{extract::State, http::StatusCode};
use bizchat_db::models::{
    Company, CompanySettings, SubscriptionStatus, SubscriptionTier,
    activity_log::{actions, resources},
};
use bizchat_services::{
    dao::{PaginatedResult, company::CompanyUpdate},
    registry::{CompanyRegistration, Registration},
};
use bson::oid::ObjectId;
use serde::Serialize;

use super::{ListQuery, audit_mutation, parse_id, timestamp, user::UserResponse};
use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo, Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub max_users: u32,
    pub settings: CompanySettings,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: company.name,
            domain: company.domain,
            email: company.email,
            phone: company.phone,
            address: company.address,
            website: company.website,
            industry: company.industry,
            subscription_tier: company.subscription_tier,
            subscription_status: company.subscription_status,
            max_users: company.max_users,
            settings: company.settings,
            is_active: company.is_active,
            created_by: company.created_by.map(|id| id.to_hex()),
            created_at: timestamp(company.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub company: CompanyResponse,
    pub admin: UserResponse,
}

impl From<Registration> for RegistrationResponse {
    fn from(registration: Registration) -> Self {
        Self {
            company: registration.company.into(),
            admin: registration.admin.into(),
        }
    }
}

/// Public sign-up of a new company and its first administrator.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CompanyRegistration>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let registration = state.registry.register(body).await?;
    Ok((StatusCode::CREATED, Json(registration.into())))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(body): Json<CompanyRegistration>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let registration = state.registry.register(body).await?;
    if let Some(id) = registration.company.id {
        audit_mutation(
            &state,
            &auth,
            &client,
            actions::CREATE_COMPANY,
            resources::COMPANY,
            id,
            format!("Created company {}", registration.company.domain),
        );
    }
    Ok((StatusCode::CREATED, Json(registration.into())))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResult<CompanyResponse>>, ApiError> {
    let result = state
        .companies
        .list(query.search.as_deref(), &query.pagination())
        .await?;
    Ok(Json(result.map(CompanyResponse::from)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company_id = parse_id(&company_id, "company_id")?;
    Ok(Json(state.companies.find_by_id(company_id).await?.into()))
}

/// Unknown fields such as `domain` are ignored by deserialization.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(company_id): Path<String>,
    Json(body): Json<CompanyUpdate>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company_id = parse_id(&company_id, "company_id")?;
    if body.is_active == Some(false) {
        ensure_not_own_company(&auth, company_id)?;
    }
    let company = state.companies.update_details(company_id, body).await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::UPDATE_COMPANY,
        resources::COMPANY,
        company_id,
        format!("Updated company {}", company.domain),
    );
    Ok(Json(company.into()))
}

pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(company_id): Path<String>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company_id = parse_id(&company_id, "company_id")?;
    ensure_not_own_company(&auth, company_id)?;
    let company = state.companies.set_active(company_id, false).await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::UPDATE_COMPANY,
        resources::COMPANY,
        company_id,
        format!("Deactivated company {}", company.domain),
    );
    Ok(Json(company.into()))
}

fn ensure_not_own_company(auth: &AuthUser, company_id: ObjectId) -> Result<(), ApiError> {
    if company_id == auth.company_id {
        return Err(ApiError::BadRequest(
            "You cannot deactivate your own company".to_string(),
        ));
    }
    Ok(())
}
