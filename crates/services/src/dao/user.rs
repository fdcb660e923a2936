use bizchat_db::{
    DocumentStore, GroupKey, GroupSort,
    models::{Role, User},
};
use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams, escape_regex};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub company_id: ObjectId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub is_super_admin: bool,
    pub created_by: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub avatar: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub role_distribution: BTreeMap<String, u64>,
}

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            base: BaseDao::new(store, User::COLLECTION),
        }
    }

    /// Creates a user holding `role`, copying its name and permissions.
    pub async fn create(&self, new: NewUser, role: &Role) -> DaoResult<User> {
        let role_id = role.id.ok_or(DaoError::NotFound)?;
        if role.company_id != new.company_id {
            return Err(DaoError::Validation(
                "Role does not belong to this company".into(),
            ));
        }
        let email = normalize_email(&new.email)?;
        if self.email_taken(new.company_id, &email, None).await? {
            return Err(DaoError::Conflict(
                "A user with this email already exists".into(),
            ));
        }

        let now = DateTime::now();
        let user = User {
            id: None,
            company_id: new.company_id,
            email,
            username: new.username,
            password_hash: new.password_hash,
            name: new.name.trim().to_string(),
            role_id,
            role_name: role.name.clone(),
            permissions: role.permissions.clone(),
            is_super_admin: new.is_super_admin,
            is_active: true,
            email_verified: false,
            avatar: None,
            phone: new.phone,
            department: new.department,
            position: new.position,
            last_login_at: None,
            last_login_ip: None,
            created_at: now,
            updated_at: now,
            created_by: new.created_by,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id(id).await
    }

    pub async fn find_in_company(&self, company_id: ObjectId, user_id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id_in_company(company_id, user_id).await
    }

    pub async fn find_by_email_in_company(
        &self,
        company_id: ObjectId,
        email: &str,
    ) -> DaoResult<User> {
        self.base
            .find_one(doc! { "company_id": company_id, "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn list(
        &self,
        company_id: ObjectId,
        search: Option<&str>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<User>> {
        let mut filter = doc! { "company_id": company_id };
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = escape_regex(term);
            filter.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "department": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }
        self.base.find_paginated(filter, None, params).await
    }

    /// Applies profile changes and, when `role` is given, moves the user to
    /// that role with a fresh copy of its name and permissions.
    pub async fn update(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        update: UserUpdate,
        role: Option<&Role>,
    ) -> DaoResult<User> {
        self.find_in_company(company_id, user_id).await?;

        let mut set = Document::new();
        if let Some(name) = update.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(DaoError::Validation("Name cannot be empty".into()));
            }
            set.insert("name", name);
        }
        for (field, value) in [
            ("username", update.username),
            ("phone", update.phone),
            ("department", update.department),
            ("position", update.position),
            ("avatar", update.avatar),
        ] {
            if let Some(value) = value {
                set.insert(field, value);
            }
        }
        if let Some(active) = update.is_active {
            set.insert("is_active", active);
        }
        if let Some(role) = role {
            if role.company_id != company_id {
                return Err(DaoError::NotFound);
            }
            let role_id = role.id.ok_or(DaoError::NotFound)?;
            set.insert("role_id", role_id);
            set.insert("role_name", role.name.clone());
            set.insert("permissions", role.permissions.clone());
        }

        self.base
            .update_one(
                doc! { "_id": user_id, "company_id": company_id },
                doc! { "$set": set },
            )
            .await?;
        self.find_in_company(company_id, user_id).await
    }

    /// Soft delete. An actor cannot deactivate their own account.
    pub async fn deactivate(
        &self,
        company_id: ObjectId,
        actor_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<User> {
        if actor_id == user_id {
            return Err(DaoError::Validation(
                "You cannot deactivate your own account".into(),
            ));
        }
        self.find_in_company(company_id, user_id).await?;
        self.base
            .update_one(
                doc! { "_id": user_id, "company_id": company_id },
                doc! { "$set": { "is_active": false } },
            )
            .await?;
        self.find_in_company(company_id, user_id).await
    }

    pub async fn record_login(&self, user_id: ObjectId, ip: Option<&str>) -> DaoResult<()> {
        let ip = ip.map(|s| Bson::String(s.to_string())).unwrap_or(Bson::Null);
        self.base
            .update_by_id(
                user_id,
                doc! { "$set": { "last_login_at": DateTime::now(), "last_login_ip": ip } },
            )
            .await?;
        Ok(())
    }

    pub async fn count_active(&self, company_id: ObjectId) -> DaoResult<u64> {
        self.base
            .count(doc! { "company_id": company_id, "is_active": true })
            .await
    }

    pub async fn stats(&self, company_id: ObjectId) -> DaoResult<UserStats> {
        let total_users = self.base.count(doc! { "company_id": company_id }).await?;
        let active_users = self.count_active(company_id).await?;
        let role_distribution = self
            .base
            .count_by(
                doc! { "company_id": company_id },
                GroupKey::Field("role_name".into()),
                GroupSort::KeyAscending,
                None,
            )
            .await?
            .into_iter()
            .filter_map(|g| g.key.as_str().map(|k| (k.to_string(), g.count)))
            .collect();

        Ok(UserStats {
            total_users,
            active_users,
            inactive_users: total_users.saturating_sub(active_users),
            role_distribution,
        })
    }

    async fn email_taken(
        &self,
        company_id: ObjectId,
        email: &str,
        except: Option<ObjectId>,
    ) -> DaoResult<bool> {
        let mut filter = doc! { "company_id": company_id, "email": email };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self.base.count(filter).await? > 0)
    }
}

fn normalize_email(email: &str) -> DaoResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DaoError::Validation("Invalid email address".into())),
    }
}
