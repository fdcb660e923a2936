use axum::{extract::FromRequestParts, http::request::Parts};
use bizchat_services::IdentityContext;

use crate::error::ApiError;

/// The verified caller, placed in the request extensions by `authenticate`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub IdentityContext);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

impl std::ops::Deref for AuthUser {
    type Target = IdentityContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
