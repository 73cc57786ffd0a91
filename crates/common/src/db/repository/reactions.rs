//! Likes and retweets
//!
//! Both are plain edges keyed by (profile, tweet). A second reaction of the
//! same kind is rejected.

use super::{is_unique_violation, Member, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;

/// Like and retweet totals for one tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub likes: u64,
    pub retweets: u64,
}

async fn ensure_tweet(txn: &DatabaseTransaction, tweet_id: i32) -> Result<()> {
    TweetEntity::find_by_id(tweet_id)
        .one(txn)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("tweet", tweet_id))
}

impl Repository {
    pub async fn like(&self, actor: &Member, tweet_id: i32) -> Result<Like> {
        let already = || AppError::AlreadyLiked { tweet_id };
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;
        ensure_tweet(&txn, tweet_id).await?;

        let inserted = LikeEntity::insert(LikeActiveModel {
            profile_id: Set(actor.profile_id),
            tweet_id: Set(tweet_id),
            created_at: Set(now.into()),
        })
        .on_conflict(
            OnConflict::columns([LikeColumn::ProfileId, LikeColumn::TweetId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(|e| if is_unique_violation(&e) { already() } else { e.into() })?;

        if inserted == 0 {
            return Err(already());
        }
        txn.commit().await?;

        info!(tweet_id, profile_id = actor.profile_id, "Tweet liked");
        Ok(Like {
            profile_id: actor.profile_id,
            tweet_id,
            created_at: now.into(),
        })
    }

    pub async fn retweet(&self, actor: &Member, tweet_id: i32) -> Result<Retweet> {
        let already = || AppError::AlreadyRetweeted { tweet_id };
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;
        ensure_tweet(&txn, tweet_id).await?;

        let inserted = RetweetEntity::insert(RetweetActiveModel {
            profile_id: Set(actor.profile_id),
            tweet_id: Set(tweet_id),
            created_at: Set(now.into()),
        })
        .on_conflict(
            OnConflict::columns([RetweetColumn::ProfileId, RetweetColumn::TweetId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(|e| if is_unique_violation(&e) { already() } else { e.into() })?;

        if inserted == 0 {
            return Err(already());
        }
        txn.commit().await?;

        info!(tweet_id, profile_id = actor.profile_id, "Tweet retweeted");
        Ok(Retweet {
            profile_id: actor.profile_id,
            tweet_id,
            created_at: now.into(),
        })
    }

    pub async fn reaction_counts(&self, tweet_id: i32) -> Result<ReactionCounts> {
        let likes = LikeEntity::find()
            .filter(LikeColumn::TweetId.eq(tweet_id))
            .count(self.read_conn())
            .await?;
        let retweets = RetweetEntity::find()
            .filter(RetweetColumn::TweetId.eq(tweet_id))
            .count(self.read_conn())
            .await?;

        Ok(ReactionCounts { likes, retweets })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{member, post, repo};
    use super::*;

    #[tokio::test]
    async fn test_double_like_is_rejected() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;
        let tweet = post(&repo, &alice, "likeable").await;

        repo.like(&bob, tweet.id).await.unwrap();
        let err = repo.like(&bob, tweet.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyLiked { tweet_id } if tweet_id == tweet.id));

        let counts = repo.reaction_counts(tweet.id).await.unwrap();
        assert_eq!(counts, ReactionCounts { likes: 1, retweets: 0 });
    }

    #[tokio::test]
    async fn test_double_retweet_is_rejected() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let tweet = post(&repo, &alice, "share me").await;

        repo.retweet(&alice, tweet.id).await.unwrap();
        let err = repo.retweet(&alice, tweet.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyRetweeted { .. }));

        // A like is a separate edge
        repo.like(&alice, tweet.id).await.unwrap();
        let counts = repo.reaction_counts(tweet.id).await.unwrap();
        assert_eq!(counts, ReactionCounts { likes: 1, retweets: 1 });
    }

    #[tokio::test]
    async fn test_reaction_on_missing_tweet() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;

        let err = repo.like(&alice, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        let err = repo.retweet(&alice, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
