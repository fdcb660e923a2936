use axum::extract::State;
use bizchat_db::models::ActivityLog;
use bizchat_services::dao::{
    PaginatedResult, PaginationParams,
    activity_log::{ActivityLogQuery, CompanyActivityStats},
    user::UserStats,
};
use bson::DateTime;
use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_id, timestamp, user::DaysQuery};
use crate::{
    error::ApiError,
    extractors::{AuthUser, Json, Query},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    /// RFC 3339.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub endpoint: Option<String>,
    pub status_code: Option<i32>,
    pub success: bool,
    pub error_msg: Option<String>,
    pub timestamp: String,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(entry: ActivityLog) -> Self {
        Self {
            id: entry.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: entry.user_id.map(|id| id.to_hex()),
            action: entry.action,
            resource: entry.resource,
            resource_id: entry.resource_id,
            description: entry.description,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            method: entry.method,
            endpoint: entry.endpoint,
            status_code: entry.status_code,
            success: entry.success,
            error_msg: entry.error_msg,
            timestamp: timestamp(entry.timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub activity: CompanyActivityStats,
    pub users: UserStats,
}

fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<DateTime>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            ChronoDateTime::parse_from_rfc3339(s.trim())
                .map(|d| DateTime::from_chrono(d.with_timezone(&Utc)))
                .map_err(|_| ApiError::BadRequest(format!("Invalid {field}; expected RFC 3339")))
        })
        .transpose()
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<LogFilter>,
) -> Result<Json<PaginatedResult<ActivityLogResponse>>, ApiError> {
    let query = ActivityLogQuery {
        user_id: filter
            .user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|raw| parse_id(raw, "user_id"))
            .transpose()?,
        action: filter.action,
        resource: filter.resource,
        start: parse_date(filter.start_date.as_deref(), "start_date")?,
        end: parse_date(filter.end_date.as_deref(), "end_date")?,
    };
    let defaults = PaginationParams::default();
    let params = PaginationParams {
        page: filter.page.unwrap_or(defaults.page),
        per_page: filter.per_page.unwrap_or(defaults.per_page),
    };

    let result = state
        .activity_logs
        .list(auth.company_id, &query, &params)
        .await?;
    Ok(Json(result.map(ActivityLogResponse::from)))
}

pub async fn analytics(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DaysQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let activity = state
        .activity_logs
        .company_stats(auth.company_id, query.days())
        .await?;
    let users = state.users.stats(auth.company_id).await?;
    Ok(Json(AnalyticsResponse { activity, users }))
}
