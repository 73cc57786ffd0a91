//! The caller's feed and notification inbox

use axum::{
    extract::{Query, State},
    Json,
};

use super::PageParams;
use crate::AppState;
use flock_common::{
    auth::AuthContext,
    db::{
        models::{Notification, Tweet},
        Repository,
    },
    errors::Result,
};

/// Live tweets from followed profiles, newest first
pub async fn feed(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Tweet>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.build_feed(auth.profile_id, params.page()).await?))
}

pub async fn notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Notification>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(
        repo.notifications_for(auth.profile_id, params.page()).await?,
    ))
}
