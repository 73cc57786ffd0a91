//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::AppState;
use flock_common::{
    auth::AuthContext,
    db::{ActiveUser, DeletionReasonCount, Repository, ACTIVE_USERS_LIMIT},
    errors::{AppError, Result},
};

/// Window used when `start` is omitted
const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

const MAX_ACTIVE_USERS: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ActiveUsersParams {
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DeletionStatsParams {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

pub async fn active_users(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<ActiveUsersParams>,
) -> Result<Json<Vec<ActiveUser>>> {
    let limit = params
        .limit
        .unwrap_or(ACTIVE_USERS_LIMIT)
        .clamp(1, MAX_ACTIVE_USERS);

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.active_users(limit).await?))
}

/// Deleted tweets per reason, for tweets created in `[start, end]`
pub async fn deletion_statistics(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<DeletionStatsParams>,
) -> Result<Json<Vec<DeletionReasonCount>>> {
    let end = params.end.unwrap_or_else(Utc::now);
    let start = params
        .start
        .unwrap_or_else(|| end - Duration::days(DEFAULT_STATS_WINDOW_DAYS));

    if start > end {
        return Err(AppError::Validation {
            message: "start must not be after end".to_string(),
            field: Some("start".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.deletion_statistics(start, end).await?))
}
