//! Public profiles and follow edges

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::MessageResponse;
use crate::AppState;
use flock_common::{
    auth::AuthContext,
    db::{Member, Repository},
    errors::{AppError, Result},
    metrics,
};

#[derive(Serialize)]
pub struct PublicProfileResponse {
    pub id: i32,
    pub username: String,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
    pub date_joined: String,
}

async fn resolve(repo: &Repository, username: &str) -> Result<Member> {
    repo.find_member(username)
        .await?
        .ok_or_else(|| AppError::not_found("user", username))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(username): Path<String>,
) -> Result<Json<PublicProfileResponse>> {
    let repo = Repository::new(state.db.clone());
    let (profile, account) = repo
        .find_member_profile(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user", &username))?;
    let (followers, following) = repo.follow_counts(profile.id).await?;

    Ok(Json(PublicProfileResponse {
        id: profile.id,
        username: account.username,
        bio: profile.bio,
        followers,
        following,
        date_joined: account.date_joined.to_rfc3339(),
    }))
}

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let repo = Repository::new(state.db.clone());
    let target = resolve(&repo, &username).await?;

    repo.follow(&auth.member(), &target).await?;
    metrics::record_follow();

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User followed successfully")),
    ))
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    let target = resolve(&repo, &username).await?;

    repo.unfollow(&auth.member(), &target).await?;
    Ok(StatusCode::NO_CONTENT)
}
