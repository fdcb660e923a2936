use bizchat_db::{
    DocumentStore,
    models::{Company, CompanySettings, SubscriptionStatus, SubscriptionTier},
};
use bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;
use std::sync::Arc;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams, escape_regex};

/// Fields a platform administrator may change. `domain` is immutable and not
/// representable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub max_users: Option<u32>,
    pub is_active: Option<bool>,
}

pub struct CompanyDao {
    pub base: BaseDao<Company>,
}

impl CompanyDao {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            base: BaseDao::new(store, Company::COLLECTION),
        }
    }

    pub async fn domain_taken(&self, domain: &str) -> DaoResult<bool> {
        Ok(self.base.count(doc! { "domain": domain }).await? > 0)
    }

    /// Whether another company already uses `email`.
    pub async fn email_taken(&self, email: &str, except: Option<ObjectId>) -> DaoResult<bool> {
        let mut filter = doc! { "email": email };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self.base.count(filter).await? > 0)
    }

    pub async fn create(&self, company: &Company) -> DaoResult<Company> {
        let id = self.base.insert_one(company).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<Company> {
        self.base.find_by_id(id).await
    }

    pub async fn find_by_domain(&self, domain: &str) -> DaoResult<Company> {
        self.base
            .find_one(doc! { "domain": domain })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn set_created_by(&self, company_id: ObjectId, user_id: ObjectId) -> DaoResult<()> {
        self.base
            .update_by_id(company_id, doc! { "$set": { "created_by": user_id } })
            .await?;
        Ok(())
    }

    pub async fn update_settings(
        &self,
        company_id: ObjectId,
        settings: &CompanySettings,
    ) -> DaoResult<Company> {
        let settings = bson::to_bson(settings)?;
        let matched = self
            .base
            .update_by_id(company_id, doc! { "$set": { "settings": settings } })
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(company_id).await
    }

    pub async fn update_details(
        &self,
        company_id: ObjectId,
        update: CompanyUpdate,
    ) -> DaoResult<Company> {
        let mut set = Document::new();
        if let Some(name) = update.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(DaoError::Validation("Company name cannot be empty".into()));
            }
            set.insert("name", name);
        }
        if let Some(email) = update.email.map(|e| e.trim().to_lowercase()) {
            if self.email_taken(&email, Some(company_id)).await? {
                return Err(DaoError::Conflict("Company email already exists".into()));
            }
            set.insert("email", email);
        }
        for (field, value) in [
            ("phone", update.phone),
            ("address", update.address),
            ("website", update.website),
            ("industry", update.industry),
        ] {
            if let Some(value) = value {
                set.insert(field, value);
            }
        }
        if let Some(tier) = update.subscription_tier {
            set.insert("subscription_tier", bson::to_bson(&tier)?);
        }
        if let Some(status) = update.subscription_status {
            set.insert("subscription_status", bson::to_bson(&status)?);
        }
        if let Some(max_users) = update.max_users {
            if max_users == 0 {
                return Err(DaoError::Validation("max_users must be positive".into()));
            }
            set.insert("max_users", i64::from(max_users));
        }
        if let Some(active) = update.is_active {
            set.insert("is_active", active);
        }

        if !self
            .base
            .update_by_id(company_id, doc! { "$set": set })
            .await?
        {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(company_id).await
    }

    pub async fn set_active(&self, company_id: ObjectId, active: bool) -> DaoResult<Company> {
        if !self
            .base
            .update_by_id(company_id, doc! { "$set": { "is_active": active } })
            .await?
        {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(company_id).await
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Company>> {
        let mut filter = Document::new();
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = escape_regex(term);
            filter.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "domain": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }
        self.base.find_paginated(filter, None, params).await
    }

    pub async fn delete(&self, company_id: ObjectId) -> DaoResult<u64> {
        self.base.delete_one(doc! { "_id": company_id }).await
    }
}
