use bizchat_db::models::{Company, User, role::permissions::RoleKind};
use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    auth::AuthService,
    dao::{CompanyDao, DaoError, RoleDao, UserDao, user::NewUser},
    error::ServiceResult,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompanyRegistration {
    /// Defaults to the domain.
    #[validate(length(min = 2, max = 100))]
    pub company_name: Option<String>,
    #[validate(length(min = 2, max = 63))]
    pub domain: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    /// Defaults to the local part of `admin_email`.
    #[validate(length(min = 1, max = 100))]
    pub admin_name: Option<String>,
    #[validate(email)]
    pub admin_email: String,
    #[validate(length(min = 6, max = 128))]
    pub admin_password: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub company: Company,
    pub admin: User,
}

/// Creates companies together with their system roles and first
/// administrator. Later steps failing undo the earlier ones.
pub struct TenantRegistry {
    companies: Arc<CompanyDao>,
    roles: Arc<RoleDao>,
    users: Arc<UserDao>,
    auth: Arc<AuthService>,
}

impl TenantRegistry {
    pub fn new(
        companies: Arc<CompanyDao>,
        roles: Arc<RoleDao>,
        users: Arc<UserDao>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            companies,
            roles,
            users,
            auth,
        }
    }

    pub async fn register(&self, input: CompanyRegistration) -> ServiceResult<Registration> {
        input
            .validate()
            .map_err(DaoError::from)?;
        let domain = normalize_domain(&input.domain)?;
        let email = input.email.trim().to_lowercase();

        if self.companies.domain_taken(&domain).await? {
            return Err(DaoError::Conflict("Company domain already exists".into()).into());
        }
        if self.companies.email_taken(&email, None).await? {
            return Err(DaoError::Conflict("Company email already exists".into()).into());
        }

        // Hash before the first write so a hashing failure leaves nothing behind.
        let password_hash = self.auth.hash_password(&input.admin_password)?;

        let company_name = input
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&domain)
            .to_string();
        let admin_name = input
            .admin_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| input.admin_email.split('@').next())
            .unwrap_or_default()
            .to_string();

        let mut draft = Company::new(company_name, domain, email);
        draft.phone = input.phone;
        draft.address = input.address;
        draft.website = input.website;
        draft.industry = input.industry;

        let mut company = self.companies.create(&draft).await?;
        let company_id = company.id.ok_or(DaoError::NotFound)?;

        if let Err(e) = self.roles.create_system_roles(company_id).await {
            self.compensate(company_id).await;
            return Err(e.into());
        }

        let admin_role = match self
            .roles
            .find_by_name(company_id, RoleKind::CompanyAdmin.name())
            .await
        {
            Ok(role) => role,
            Err(e) => {
                self.compensate(company_id).await;
                return Err(e.into());
            }
        };

        let new_admin = NewUser {
            company_id,
            email: input.admin_email,
            name: admin_name,
            password_hash,
            username: None,
            phone: None,
            department: None,
            position: None,
            is_super_admin: false,
            created_by: None,
        };
        let admin = match self.users.create(new_admin, &admin_role).await {
            Ok(user) => user,
            Err(e) => {
                self.compensate(company_id).await;
                return Err(e.into());
            }
        };
        let admin_id = admin.id.ok_or(DaoError::NotFound)?;

        match self.companies.set_created_by(company_id, admin_id).await {
            Ok(()) => company.created_by = Some(admin_id),
            Err(e) => warn!(
                %company_id,
                error = %e,
                "Could not record company creator"
            ),
        }

        info!(%company_id, domain = %company.domain, "Company registered");
        Ok(Registration { company, admin })
    }

    /// Removes the company and any roles created for it.
    async fn compensate(&self, company_id: ObjectId) {
        if let Err(e) = self.roles.delete_for_company(company_id).await {
            alert(company_id, "roles", &e);
        }
        if let Err(e) = self.companies.delete(company_id).await {
            alert(company_id, "company", &e);
        }
    }
}

fn alert(company_id: ObjectId, step: &str, e: &DaoError) {
    error!(
        target: "bizchat::alert",
        critical = true,
        %company_id,
        step,
        error = %e,
        "Registration rollback failed; orphaned records remain"
    );
}

/// Lowercase letters, digits and inner hyphens.
pub fn normalize_domain(raw: &str) -> Result<String, DaoError> {
    let domain = raw.trim().to_lowercase();
    let valid = domain.len() >= 2
        && domain.len() <= 63
        && domain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !domain.starts_with('-')
        && !domain.ends_with('-');
    if valid {
        Ok(domain)
    } else {
        Err(DaoError::Validation(
            "Domain may only contain lowercase letters, digits and hyphens".into(),
        ))
    }
}
