use bizchat_db::{
    DocumentStore, GroupKey, GroupSort,
    models::{ActivityLog, User, activity_log::actions},
};
use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

#[derive(Debug, Clone, Default)]
pub struct ActivityLogQuery {
    pub user_id: Option<ObjectId>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub start: Option<DateTime>,
    pub end: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub activity_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyActivityStats {
    pub period_days: i64,
    pub total_activities: u64,
    pub daily_activities: Vec<DailyCount>,
    pub most_active_users: Vec<ActiveUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivitySummary {
    pub period_days: i64,
    pub total_activities: u64,
    pub action_breakdown: BTreeMap<String, u64>,
    pub last_login: Option<chrono::DateTime<Utc>>,
}

pub struct ActivityLogDao {
    pub base: BaseDao<ActivityLog>,
    users: BaseDao<User>,
}

impl ActivityLogDao {
    pub const MOST_ACTIVE_LIMIT: i64 = 10;

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            base: BaseDao::new(store.clone(), ActivityLog::COLLECTION),
            users: BaseDao::new(store, User::COLLECTION),
        }
    }

    pub async fn insert(&self, entry: &ActivityLog) -> DaoResult<ObjectId> {
        self.base.insert_one(entry).await
    }

    /// Newest first, always scoped to one company.
    pub async fn list(
        &self,
        company_id: ObjectId,
        query: &ActivityLogQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<ActivityLog>> {
        let mut filter = doc! { "company_id": company_id };
        if let Some(user_id) = query.user_id {
            filter.insert("user_id", user_id);
        }
        if let Some(action) = query.action.as_deref().filter(|a| !a.is_empty()) {
            filter.insert("action", action);
        }
        if let Some(resource) = query.resource.as_deref().filter(|r| !r.is_empty()) {
            filter.insert("resource", resource);
        }
        let mut range = Document::new();
        if let Some(start) = query.start {
            range.insert("$gte", start);
        }
        if let Some(end) = query.end {
            range.insert("$lte", end);
        }
        if !range.is_empty() {
            filter.insert("timestamp", range);
        }

        self.base
            .find_paginated(filter, Some(doc! { "timestamp": -1 }), params)
            .await
    }

    pub async fn company_stats(
        &self,
        company_id: ObjectId,
        days: i64,
    ) -> DaoResult<CompanyActivityStats> {
        let filter = doc! { "company_id": company_id, "timestamp": { "$gte": since(days) } };

        let total_activities = self.base.count(filter.clone()).await?;
        let daily_activities = self
            .base
            .count_by(
                filter.clone(),
                GroupKey::Day("timestamp".into()),
                GroupSort::KeyAscending,
                None,
            )
            .await?
            .into_iter()
            .filter_map(|g| {
                g.key.as_str().map(|date| DailyCount {
                    date: date.to_string(),
                    count: g.count,
                })
            })
            .collect();

        let mut user_filter = filter;
        user_filter.insert("user_id", doc! { "$ne": Bson::Null });
        let top = self
            .base
            .count_by(
                user_filter,
                GroupKey::Field("user_id".into()),
                GroupSort::CountDescending,
                Some(Self::MOST_ACTIVE_LIMIT),
            )
            .await?;

        let mut most_active_users = Vec::with_capacity(top.len());
        for group in top {
            let Some(user_id) = group.key.as_object_id() else {
                continue;
            };
            let user = self
                .users
                .find_one(doc! { "_id": user_id, "company_id": company_id })
                .await?;
            most_active_users.push(ActiveUser {
                user_id: user_id.to_hex(),
                name: user.as_ref().map(|u| u.name.clone()),
                email: user.map(|u| u.email),
                activity_count: group.count,
            });
        }

        Ok(CompanyActivityStats {
            period_days: days,
            total_activities,
            daily_activities,
            most_active_users,
        })
    }

    pub async fn user_summary(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        days: i64,
    ) -> DaoResult<UserActivitySummary> {
        let filter = doc! {
            "company_id": company_id,
            "user_id": user_id,
            "timestamp": { "$gte": since(days) },
        };

        let total_activities = self.base.count(filter.clone()).await?;
        let action_breakdown = self
            .base
            .count_by(
                filter,
                GroupKey::Field("action".into()),
                GroupSort::CountDescending,
                None,
            )
            .await?
            .into_iter()
            .filter_map(|g| g.key.as_str().map(|a| (a.to_string(), g.count)))
            .collect();

        let last_login = self
            .base
            .find_one_sorted(
                doc! {
                    "company_id": company_id,
                    "user_id": user_id,
                    "action": actions::LOGIN,
                    "success": true,
                },
                Some(doc! { "timestamp": -1 }),
            )
            .await?
            .map(|entry| entry.timestamp.to_chrono());

        Ok(UserActivitySummary {
            period_days: days,
            total_activities,
            action_breakdown,
            last_login,
        })
    }
}

fn since(days: i64) -> DateTime {
    DateTime::from_chrono(Utc::now() - Duration::days(days.max(0)))
}
