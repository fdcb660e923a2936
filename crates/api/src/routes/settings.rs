use axum::extract::State;
use bizchat_db::models::{
    CompanySettings,
    activity_log::{actions, resources},
};

use super::audit_mutation;
use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo, Json},
    state::AppState,
};

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CompanySettings>, ApiError> {
    let company = state.companies.find_by_id(auth.company_id).await?;
    Ok(Json(company.settings))
}

/// Replaces the whole settings document; omitted fields take their defaults.
pub async fn replace(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(body): Json<CompanySettings>,
) -> Result<Json<CompanySettings>, ApiError> {
    if body.session_timeout == 0
        || body.max_chats_per_user == 0
        || body.max_messages_per_chat == 0
        || body.max_document_size == 0
    {
        return Err(ApiError::BadRequest(
            "Timeouts and limits must be positive".to_string(),
        ));
    }
    let company = state
        .companies
        .update_settings(auth.company_id, &body)
        .await?;
    audit_mutation(
        &state,
        &auth,
        &client,
        actions::UPDATE_SETTINGS,
        resources::SETTINGS,
        auth.company_id,
        "Updated company settings".to_string(),
    );
    Ok(Json(company.settings))
}
