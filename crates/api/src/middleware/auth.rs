//! Authentication and authorization gates.
//!
//! `authenticate` turns the session token into an [`IdentityContext`] stored
//! in the request extensions. Gates only read that context; they never touch
//! the store.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bizchat_services::IdentityContext;
use futures::future::BoxFuture;

use crate::{error::ApiError, state::AppState};

pub const TOKEN_COOKIE: &str = "token";

/// Bearer header first, then the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|cookies| cookies.split(';'))
                .find_map(|cookie| {
                    cookie
                        .trim()
                        .strip_prefix(TOKEN_COOKIE)
                        .and_then(|rest| rest.strip_prefix('='))
                        .map(str::to_string)
                })
                .filter(|s| !s.is_empty())
        })
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    let identity = state.auth.parse_and_verify(&token)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[derive(Debug, Clone)]
pub enum Gate {
    Permission(&'static str),
    AnyPermission(&'static [&'static str]),
    SuperAdmin,
    /// Company admins and super admins.
    TenantAdmin,
}

impl Gate {
    pub fn check(&self, identity: Option<&IdentityContext>) -> Result<(), ApiError> {
        let identity = identity
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let allowed = match self {
            Gate::Permission(permission) => identity.has_permission(permission),
            Gate::AnyPermission(candidates) => identity.has_any_permission(candidates),
            Gate::SuperAdmin => identity.is_super_admin,
            Gate::TenantAdmin => identity.is_tenant_admin(),
        };
        if allowed {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

/// Middleware function enforcing `gate`, for use with `from_fn`.
pub fn require(
    gate: Gate,
) -> impl Fn(Request, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    move |req: Request, next: Next| {
        let verdict = gate.check(req.extensions().get::<IdentityContext>());
        Box::pin(async move {
            match verdict {
                Ok(()) => next.run(req).await,
                Err(e) => e.into_response(),
            }
        })
    }
}
