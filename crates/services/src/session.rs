use bizchat_db::models::{
    ActivityLog, User,
    activity_log::{actions, resources},
};
use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    audit::AuditPipeline,
    auth::{AuthError, AuthService, IdentityContext, IssuedToken},
    dao::{CompanyDao, DaoError, UserDao},
    error::ServiceResult,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub company_domain: String,
}

/// Where a request came from, for audit entries.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub identity: IdentityContext,
    pub user: User,
}

pub struct SessionService {
    companies: Arc<CompanyDao>,
    users: Arc<UserDao>,
    auth: Arc<AuthService>,
    audit: AuditPipeline,
}

impl SessionService {
    pub fn new(
        companies: Arc<CompanyDao>,
        users: Arc<UserDao>,
        auth: Arc<AuthService>,
        audit: AuditPipeline,
    ) -> Self {
        Self {
            companies,
            users,
            auth,
            audit,
        }
    }

    pub async fn login(&self, request: LoginRequest, meta: &RequestMeta) -> ServiceResult<LoginOutcome> {
        request
            .validate()
            .map_err(DaoError::from)?;

        let company = match self
            .companies
            .find_by_domain(&request.company_domain.trim().to_lowercase())
            .await
        {
            Ok(company) => company,
            Err(DaoError::NotFound) => {
                self.auth.burn_verification(&request.password);
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };
        if !company.is_active {
            return Err(AuthError::AccountDisabled("company account is suspended".into()).into());
        }
        let company_id = company.id.ok_or(DaoError::NotFound)?;

        let user = match self
            .users
            .find_by_email_in_company(company_id, &request.email)
            .await
        {
            Ok(user) => user,
            Err(DaoError::NotFound) => {
                self.auth.burn_verification(&request.password);
                self.record_failure(company_id, None, meta, "unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };

        if !user.is_active {
            self.auth.burn_verification(&request.password);
            return Err(AuthError::AccountDisabled("user account is deactivated".into()).into());
        }

        if !self.auth.verify_password(&request.password, &user.password_hash) {
            self.record_failure(company_id, user.id, meta, "wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let identity = IdentityContext::for_user(&user).ok_or(DaoError::NotFound)?;
        if let Err(e) = self
            .users
            .record_login(identity.user_id, meta.ip.as_deref())
            .await
        {
            warn!(user_id = %identity.user_id, error = %e, "Could not record last login");
        }
        let token = self.auth.issue_token(&identity)?;

        self.audit.record(
            self.entry(company_id, Some(identity.user_id), actions::LOGIN, meta)
                .with_resource_id(identity.user_id.to_hex())
                .with_description("User logged in")
                .with_status(200),
        );
        info!(user_id = %identity.user_id, company_id = %company_id, "User logged in");

        Ok(LoginOutcome {
            token,
            identity,
            user,
        })
    }

    fn record_failure(
        &self,
        company_id: ObjectId,
        user_id: Option<ObjectId>,
        meta: &RequestMeta,
        reason: &str,
    ) {
        self.audit.record(
            self.entry(company_id, user_id, actions::FAILED_LOGIN, meta)
                .with_description("Failed login attempt")
                .with_status(401)
                .failed(reason),
        );
    }

    fn entry(
        &self,
        company_id: ObjectId,
        user_id: Option<ObjectId>,
        action: &str,
        meta: &RequestMeta,
    ) -> ActivityLog {
        ActivityLog::new(company_id, user_id, action, resources::USER)
            .with_client(meta.ip.clone(), meta.user_agent.clone())
            .with_request(meta.method.clone(), meta.path.clone())
    }
}
