use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, HeaderValue, header},
};
use bizchat_config::JwtSettings;
use bizchat_db::models::{
    ActivityLog,
    activity_log::{actions, resources},
};
use bizchat_services::session::{LoginRequest, RequestMeta};
use serde::Serialize;

use super::user::UserResponse;
use crate::{
    error::ApiError,
    extractors::{AuthUser, ClientInfo, Json},
    middleware::auth::{TOKEN_COOKIE, token_from_headers},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

fn session_cookie(jwt: &JwtSettings, value: &str, max_age: u64) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{TOKEN_COOKIE}={value}; HttpOnly; Path=/; SameSite={}; Max-Age={max_age}",
        jwt.cookie_same_site
    );
    if jwt.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(format!("Invalid cookie: {e}")))
}

pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    let meta = RequestMeta {
        ip: client.ip,
        user_agent: client.user_agent,
        method: "POST".to_string(),
        path: uri.path().to_string(),
    };
    let outcome = state.sessions.login(body, &meta).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(
            &state.settings.jwt,
            &outcome.token.token,
            state.settings.jwt.token_ttl_secs,
        )?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            token: outcome.token.token,
            expires_at: outcome.token.expires_at.to_rfc3339(),
            user: outcome.user.into(),
        }),
    ))
}

/// Clears the cookie. A still-valid token gets a logout entry.
pub async fn logout(
    State(state): State<AppState>,
    client: ClientInfo,
    OriginalUri(uri): OriginalUri,
    request_headers: HeaderMap,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    if let Some(identity) = token_from_headers(&request_headers)
        .and_then(|token| state.auth.parse_and_verify(&token).ok())
    {
        state.audit.record(
            ActivityLog::new(
                identity.company_id,
                Some(identity.user_id),
                actions::LOGOUT,
                resources::USER,
            )
            .with_resource_id(identity.user_id.to_hex())
            .with_description("User logged out")
            .with_client(client.ip, client.user_agent)
            .with_request("POST", uri.path())
            .with_status(200),
        );
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&state.settings.jwt, "", 0)?);
    Ok((headers, Json(serde_json::json!({ "logged_out": true }))))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_in_company(auth.company_id, auth.user_id)
        .await?;
    Ok(Json(user.into()))
}

/// Self-service sign-up is not offered; accounts come from company admins.
pub async fn register_disabled() -> ApiError {
    ApiError::Forbidden(
        "Public user registration is disabled. Register a company via \
         /api/companies/register or ask your company administrator for an account."
            .to_string(),
    )
}
