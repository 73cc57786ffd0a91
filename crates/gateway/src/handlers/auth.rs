//! Registration, token issuance and the caller's own profile

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use flock_common::{
    auth::{hash_password, verify_password, AuthContext},
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub bio: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: i32,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1))]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct OwnProfileResponse {
    pub username: String,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 500))]
    pub bio: String,
}

/// Create an account together with its profile
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let password_hash = hash_password(&request.password)?;
    let (account, _) = repo
        .create_account(&request.username, &password_hash, &request.bio)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            username: account.username,
            message: "User created successfully".to_string(),
        }),
    ))
}

/// Exchange credentials for a bearer token
pub async fn token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let account = repo
        .find_account_by_username(&request.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&request.password, &account.password_hash)? {
        tracing::warn!(username = %request.username, "Rejected login");
        return Err(AppError::InvalidCredentials);
    }

    let account = repo.record_login(account.id).await?;
    let profile = repo.ensure_profile(account.id).await?;

    issue(&state, account.id, profile.id, &account.username)
}

/// Fresh token for a caller whose token is still valid
pub async fn refresh(State(state): State<AppState>, auth: AuthContext) -> Result<Json<TokenResponse>> {
    issue(&state, auth.account_id, auth.profile_id, &auth.username)
}

fn issue(state: &AppState, account_id: i32, profile_id: i32, username: &str) -> Result<Json<TokenResponse>> {
    let access_token = state.jwt.generate_token(account_id, profile_id, username)?;

    tracing::info!(account_id, username, "Token issued");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.expiration_secs(),
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OwnProfileResponse>> {
    let repo = Repository::new(state.db.clone());
    let profile = repo
        .find_profile_by_account(auth.account_id)
        .await?
        .ok_or_else(|| AppError::not_found("profile", auth.profile_id))?;
    let (followers, following) = repo.follow_counts(profile.id).await?;

    Ok(Json(OwnProfileResponse {
        username: auth.username,
        bio: profile.bio,
        followers,
        following,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<OwnProfileResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let profile = repo.update_bio(auth.profile_id, &request.bio).await?;
    let (followers, following) = repo.follow_counts(profile.id).await?;

    Ok(Json(OwnProfileResponse {
        username: auth.username,
        bio: profile.bio,
        followers,
        following,
    }))
}
