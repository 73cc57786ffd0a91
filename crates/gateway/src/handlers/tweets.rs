//! Tweet handlers: CRUD, soft delete, reactions and hashtag ranking

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{MessageResponse, PageParams};
use crate::AppState;
use flock_common::{
    auth::AuthContext,
    db::{
        models::Tweet, HashtagCount, NewTweet, ReactionCounts, Repository, POPULAR_WINDOW_DAYS,
    },
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTweetRequest {
    #[validate(length(min = 1, max = 280))]
    pub content: String,

    pub parent_tweet_id: Option<i32>,

    /// Extra tags on top of the `#word` tokens in the content
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTweetRequest {
    pub delete_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub days: Option<u32>,
}

#[derive(Serialize)]
pub struct TweetDetailResponse {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub hashtags: Vec<String>,
    #[serde(flatten)]
    pub reactions: ReactionCounts,
}

pub async fn list_tweets(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Tweet>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_tweets(params.page()).await?))
}

pub async fn create_tweet(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateTweetRequest>,
) -> Result<(StatusCode, Json<Tweet>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let tweet = repo
        .create_tweet(
            auth.profile_id,
            NewTweet {
                content: request.content,
                parent_tweet_id: request.parent_tweet_id,
                hashtags: request.hashtags,
            },
        )
        .await?;
    metrics::record_tweet_created();

    Ok((StatusCode::CREATED, Json(tweet)))
}

pub async fn get_tweet(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(tweet_id): Path<i32>,
) -> Result<Json<TweetDetailResponse>> {
    let repo = Repository::new(state.db.clone());
    let tweet = repo
        .find_tweet(tweet_id)
        .await?
        .ok_or_else(|| AppError::not_found("tweet", tweet_id))?;

    let hashtags = repo.tweet_hashtags(tweet.id).await?;
    let reactions = repo.reaction_counts(tweet.id).await?;

    Ok(Json(TweetDetailResponse {
        tweet,
        hashtags,
        reactions,
    }))
}

/// Soft delete. The body is optional; a missing or empty reason is
/// recorded as the default one.
pub async fn delete_tweet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(tweet_id): Path<i32>,
    body: Option<Json<DeleteTweetRequest>>,
) -> Result<StatusCode> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let repo = Repository::new(state.db.clone());
    let stamped = repo
        .soft_delete_tweet(tweet_id, request.delete_reason.as_deref())
        .await?;
    metrics::record_tweets_deleted("soft", stamped);

    tracing::info!(tweet_id, caller = %auth.username, stamped, "Tweet deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_tweet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(tweet_id): Path<i32>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let repo = Repository::new(state.db.clone());
    repo.like(&auth.member(), tweet_id).await?;
    metrics::record_reaction("like");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Tweet liked successfully")),
    ))
}

pub async fn retweet_tweet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(tweet_id): Path<i32>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let repo = Repository::new(state.db.clone());
    repo.retweet(&auth.member(), tweet_id).await?;
    metrics::record_reaction("retweet");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Tweet retweeted successfully")),
    ))
}

pub async fn popular_hashtags(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<PopularParams>,
) -> Result<Json<Vec<HashtagCount>>> {
    let days = params.days.unwrap_or(POPULAR_WINDOW_DAYS);
    if days == 0 {
        return Err(AppError::Validation {
            message: "days must be at least 1".to_string(),
            field: Some("days".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.popular_hashtags(days).await?))
}
