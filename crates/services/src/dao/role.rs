use bizchat_db::{
    DocumentStore,
    models::{Role, User, role::permissions},
};
use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::base::{BaseDao, DaoError, DaoResult};

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Metadata edits. `name` and `is_system` are refused on system roles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub is_system: Option<bool>,
}

pub struct RoleDao {
    pub base: BaseDao<Role>,
    users: BaseDao<User>,
}

impl RoleDao {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            base: BaseDao::new(store.clone(), Role::COLLECTION),
            users: BaseDao::new(store, User::COLLECTION),
        }
    }

    /// Inserts company_admin, manager and employee with their template
    /// permissions.
    pub async fn create_system_roles(&self, company_id: ObjectId) -> DaoResult<Vec<Role>> {
        let mut roles: Vec<Role> = permissions::RoleKind::SYSTEM
            .into_iter()
            .map(|kind| Role::system(company_id, kind))
            .collect();
        let ids = self.base.insert_many(&roles).await?;
        for (role, id) in roles.iter_mut().zip(ids) {
            role.id = Some(id);
        }
        Ok(roles)
    }

    pub async fn find_by_name(&self, company_id: ObjectId, name: &str) -> DaoResult<Role> {
        self.base
            .find_one(doc! { "company_id": company_id, "name": name })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_in_company(&self, company_id: ObjectId, role_id: ObjectId) -> DaoResult<Role> {
        self.base.find_by_id_in_company(company_id, role_id).await
    }

    pub async fn list_by_company(&self, company_id: ObjectId) -> DaoResult<Vec<Role>> {
        self.base
            .find_many(
                doc! { "company_id": company_id },
                Some(doc! { "is_system": -1, "name": 1 }),
            )
            .await
    }

    pub async fn create_custom(&self, company_id: ObjectId, new: NewRole) -> DaoResult<Role> {
        let name = normalize_name(&new.name)?;
        if self.name_taken(company_id, &name, None).await? {
            return Err(DaoError::Conflict("Role name already exists".into()));
        }
        let now = DateTime::now();
        let role = Role {
            id: None,
            company_id,
            display_name: non_empty(new.display_name).unwrap_or_else(|| name.clone()),
            name,
            description: new.description,
            permissions: permissions::normalize(new.permissions),
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        let id = self.base.insert_one(&role).await?;
        self.base.find_by_id(id).await
    }

    pub async fn update_details(
        &self,
        company_id: ObjectId,
        role_id: ObjectId,
        update: RoleUpdate,
    ) -> DaoResult<Role> {
        let role = self.find_in_company(company_id, role_id).await?;

        if role.is_system {
            if update.name.as_deref().is_some_and(|n| n.trim() != role.name) {
                return Err(DaoError::Validation("System roles cannot be renamed".into()));
            }
            if update.is_system.is_some_and(|flag| !flag) {
                return Err(DaoError::Validation(
                    "System role flag cannot be changed".into(),
                ));
            }
        } else if update.is_system == Some(true) {
            return Err(DaoError::Validation(
                "Custom roles cannot be marked as system roles".into(),
            ));
        }

        let mut set = Document::new();
        let mut renamed_to = None;
        if let Some(name) = update.name.as_deref() {
            let name = normalize_name(name)?;
            if name != role.name {
                if self.name_taken(company_id, &name, Some(role_id)).await? {
                    return Err(DaoError::Conflict("Role name already exists".into()));
                }
                set.insert("name", name.clone());
                renamed_to = Some(name);
            }
        }
        if let Some(display_name) = update.display_name.and_then(non_empty) {
            set.insert("display_name", display_name);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }

        if !set.is_empty() {
            self.base
                .update_one(
                    doc! { "_id": role_id, "company_id": company_id },
                    doc! { "$set": set },
                )
                .await?;
        }
        if let Some(name) = renamed_to {
            self.users
                .update_many(
                    doc! { "company_id": company_id, "role_id": role_id },
                    doc! { "$set": { "role_name": name } },
                )
                .await?;
        }
        self.find_in_company(company_id, role_id).await
    }

    /// Overwrites the role's permission list, then copies it onto every user
    /// holding the role. Returns the updated role and the number of users
    /// refreshed. A failure between the two writes leaves users stale until
    /// the next edit.
    pub async fn update_permissions(
        &self,
        company_id: ObjectId,
        role_id: ObjectId,
        new_permissions: Vec<String>,
    ) -> DaoResult<(Role, u64)> {
        self.find_in_company(company_id, role_id).await?;
        let list = permissions::normalize(new_permissions);

        self.base
            .update_one(
                doc! { "_id": role_id, "company_id": company_id },
                doc! { "$set": { "permissions": list.clone() } },
            )
            .await?;

        let refreshed = self
            .users
            .update_many(
                doc! { "company_id": company_id, "role_id": role_id },
                doc! { "$set": { "permissions": list } },
            )
            .await?;

        info!(%company_id, %role_id, users = refreshed, "Role permissions updated");
        let role = self.find_in_company(company_id, role_id).await?;
        Ok((role, refreshed))
    }

    /// Deletes a custom role nobody holds.
    pub async fn delete(&self, company_id: ObjectId, role_id: ObjectId) -> DaoResult<()> {
        let role = self.find_in_company(company_id, role_id).await?;
        if role.is_system {
            return Err(DaoError::Validation("System roles cannot be deleted".into()));
        }
        let holders = self
            .users
            .count(doc! { "company_id": company_id, "role_id": role_id })
            .await?;
        if holders > 0 {
            return Err(DaoError::Conflict(format!(
                "Role is assigned to {holders} user(s)"
            )));
        }
        self.base
            .delete_one(doc! { "_id": role_id, "company_id": company_id })
            .await?;
        Ok(())
    }

    pub async fn delete_for_company(&self, company_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "company_id": company_id }).await
    }

    async fn name_taken(
        &self,
        company_id: ObjectId,
        name: &str,
        except: Option<ObjectId>,
    ) -> DaoResult<bool> {
        let mut filter = doc! { "company_id": company_id, "name": name };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self.base.count(filter).await? > 0)
    }
}

fn normalize_name(name: &str) -> DaoResult<String> {
    let name = name.trim().to_lowercase().replace(' ', "_");
    if name.is_empty() {
        return Err(DaoError::Validation("Role name cannot be empty".into()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(DaoError::Validation(
            "Role name may only contain letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(name)
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}
