use bizchat_db::models::{User, role::permissions};
use bson::oid::ObjectId;
use serde::Serialize;

use super::{AuthError, Claims};

/// Trusted facts about the caller, derived only from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub user_id: ObjectId,
    pub company_id: ObjectId,
    pub email: String,
    pub role_id: ObjectId,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub is_super_admin: bool,
}

impl IdentityContext {
    /// `None` for a user that was never persisted.
    pub fn for_user(user: &User) -> Option<Self> {
        Some(Self {
            user_id: user.id?,
            company_id: user.company_id,
            email: user.email.clone(),
            role_id: user.role_id,
            role_name: user.role_name.clone(),
            permissions: permissions::normalize(&user.permissions),
            is_super_admin: user.is_super_admin,
        })
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        permissions::has(&self.permissions, permission)
    }

    pub fn has_any_permission(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|p| self.has_permission(p))
    }

    pub fn is_tenant_admin(&self) -> bool {
        self.is_super_admin
            || self.role_name == permissions::RoleKind::CompanyAdmin.name()
    }

    pub(crate) fn to_claims(&self, iat: i64, exp: i64) -> Claims {
        Claims {
            user_id: self.user_id.to_hex(),
            company_id: self.company_id.to_hex(),
            email: self.email.clone(),
            role_id: self.role_id.to_hex(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
            is_super_admin: self.is_super_admin,
            iat,
            exp,
        }
    }
}

impl TryFrom<Claims> for IdentityContext {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let parse = |hex: &str| ObjectId::parse_str(hex).map_err(|_| AuthError::InvalidToken);
        Ok(Self {
            user_id: parse(&claims.user_id)?,
            company_id: parse(&claims.company_id)?,
            role_id: parse(&claims.role_id)?,
            email: claims.email,
            role_name: claims.role_name,
            permissions: permissions::normalize(claims.permissions),
            is_super_admin: claims.is_super_admin,
        })
    }
}
