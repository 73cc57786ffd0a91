//! Tweet lifecycle: creation, reply threading, soft and hard deletion
//!
//! Reply trees are walked iteratively. Each cascade runs in a single
//! transaction, so a failure part way through leaves the tree untouched.

use super::{Page, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::{DEFAULT_DELETE_REASON, PARENT_DELETED_REASON};
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Input for a new tweet
#[derive(Debug, Clone, Default)]
pub struct NewTweet {
    pub content: String,
    pub parent_tweet_id: Option<i32>,
    /// Explicit tags, merged with the `#word` tokens found in the content
    pub hashtags: Vec<String>,
}

impl NewTweet {
    /// A top-level tweet with no explicit tags
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"))
}

/// Lower-cased, deduplicated tags from the explicit list and the content,
/// in order of first appearance.
pub fn collect_hashtags(content: &str, explicit: &[String]) -> Vec<String> {
    let from_content = hashtag_pattern()
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));

    let mut seen = HashSet::new();
    explicit
        .iter()
        .map(|t| t.trim().trim_start_matches('#'))
        .chain(from_content)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// The reason recorded on a soft-deleted root tweet
pub fn delete_reason_or_default(reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DEFAULT_DELETE_REASON.to_string(),
    }
}

impl Repository {
    /// Create a tweet, linking its hashtags
    pub async fn create_tweet(&self, author_id: i32, new: NewTweet) -> Result<Tweet> {
        let tags = collect_hashtags(&new.content, &new.hashtags);
        let txn = self.write_conn().begin().await?;

        if let Some(parent_id) = new.parent_tweet_id {
            TweetEntity::find_by_id(parent_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::not_found("tweet", parent_id))?;
        }

        let tweet = TweetActiveModel {
            content: Set(new.content),
            created_at: Set(Utc::now().into()),
            author_id: Set(author_id),
            is_deleted: Set(false),
            delete_reason: Set(String::new()),
            parent_tweet_id: Set(new.parent_tweet_id),
            external_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for tag in &tags {
            let hashtag = upsert_hashtag(&txn, tag).await?;
            TweetHashtagEntity::insert(TweetHashtagActiveModel {
                tweet_id: Set(tweet.id),
                hashtag_id: Set(hashtag.id),
            })
            .on_conflict(
                OnConflict::columns([TweetHashtagColumn::TweetId, TweetHashtagColumn::HashtagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(
            tweet_id = tweet.id,
            author_id,
            parent_tweet_id = ?tweet.parent_tweet_id,
            hashtags = tags.len(),
            "Tweet created"
        );
        Ok(tweet)
    }

    /// Find tweet by ID, deleted or not
    pub async fn find_tweet(&self, id: i32) -> Result<Option<Tweet>> {
        TweetEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Newest first. Deleted tweets are included and carry their flag.
    /// `None` returns every row.
    pub async fn list_tweets(&self, page: Option<Page>) -> Result<Vec<Tweet>> {
        TweetEntity::find()
            .order_by_desc(TweetColumn::CreatedAt)
            .order_by_desc(TweetColumn::Id)
            .offset(page.map(|p| p.offset))
            .limit(page.map(|p| p.limit))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Tags linked to a tweet, alphabetical
    pub async fn tweet_hashtags(&self, tweet_id: i32) -> Result<Vec<String>> {
        HashtagEntity::find()
            .select_only()
            .column(HashtagColumn::Tag)
            .join(JoinType::InnerJoin, HashtagRelation::TweetHashtags.def())
            .filter(TweetHashtagColumn::TweetId.eq(tweet_id))
            .order_by_asc(HashtagColumn::Tag)
            .into_tuple::<String>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Soft-delete a tweet and every reply beneath it.
    ///
    /// The root gets `reason` (or the default); descendants get
    /// [`PARENT_DELETED_REASON`], including ones that were already deleted.
    /// Returns the number of rows stamped.
    pub async fn soft_delete_tweet(&self, id: i32, reason: Option<&str>) -> Result<u64> {
        let txn = self.write_conn().begin().await?;

        let tweet = TweetEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("tweet", id))?;

        if tweet.is_deleted {
            return Err(AppError::AlreadyDeleted { id });
        }

        let reason = delete_reason_or_default(reason);
        let mut root: TweetActiveModel = tweet.into();
        root.is_deleted = Set(true);
        root.delete_reason = Set(reason.clone());
        root.update(&txn).await?;

        let mut stamped = 1;
        let mut visited = HashSet::from([id]);
        let mut stack = vec![id];

        while let Some(parent_id) = stack.pop() {
            let replies: Vec<i32> = reply_ids(&txn, &[parent_id])
                .await?
                .into_iter()
                .filter(|reply| visited.insert(*reply))
                .collect();

            if replies.is_empty() {
                continue;
            }

            let result = TweetEntity::update_many()
                .col_expr(TweetColumn::IsDeleted, Expr::value(true))
                .col_expr(TweetColumn::DeleteReason, Expr::value(PARENT_DELETED_REASON))
                .filter(TweetColumn::Id.is_in(replies.clone()))
                .exec(&txn)
                .await?;

            stamped += result.rows_affected;
            stack.extend(replies);
        }

        txn.commit().await?;

        info!(tweet_id = id, reason = %reason, stamped, "Tweet soft-deleted");
        Ok(stamped)
    }

    /// Permanently remove a tweet and its whole reply tree.
    ///
    /// Likes, retweets and hashtag links go first, then the tweets
    /// themselves, deepest level first. Returns the number of tweets removed.
    pub async fn hard_delete_tweet(&self, id: i32) -> Result<u64> {
        let txn = self.write_conn().begin().await?;

        TweetEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("tweet", id))?;

        let mut visited = HashSet::from([id]);
        let mut levels = vec![vec![id]];
        loop {
            let last = levels.last().map(Vec::as_slice).unwrap_or_default();
            let next: Vec<i32> = reply_ids(&txn, last)
                .await?
                .into_iter()
                .filter(|reply| visited.insert(*reply))
                .collect();
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        let all: Vec<i32> = levels.iter().flatten().copied().collect();

        LikeEntity::delete_many()
            .filter(LikeColumn::TweetId.is_in(all.clone()))
            .exec(&txn)
            .await?;
        RetweetEntity::delete_many()
            .filter(RetweetColumn::TweetId.is_in(all.clone()))
            .exec(&txn)
            .await?;
        TweetHashtagEntity::delete_many()
            .filter(TweetHashtagColumn::TweetId.is_in(all))
            .exec(&txn)
            .await?;

        let mut deleted = 0;
        for level in levels.iter().rev() {
            let result = TweetEntity::delete_many()
                .filter(TweetColumn::Id.is_in(level.clone()))
                .exec(&txn)
                .await?;
            deleted += result.rows_affected;
        }

        txn.commit().await?;

        info!(tweet_id = id, deleted, depth = levels.len(), "Tweet hard-deleted");
        Ok(deleted)
    }

    /// Insert or refresh an ingested tweet keyed by its upstream id.
    ///
    /// Returns the tweet and whether it was newly created.
    pub async fn upsert_external_tweet(
        &self,
        author_id: i32,
        external_id: &str,
        content: &str,
    ) -> Result<(Tweet, bool)> {
        let txn = self.write_conn().begin().await?;
        let now = Utc::now();

        let existing = TweetEntity::find()
            .filter(TweetColumn::ExternalId.eq(external_id))
            .one(&txn)
            .await?;

        let (tweet, created) = match existing {
            Some(tweet) => {
                let mut tweet: TweetActiveModel = tweet.into();
                tweet.content = Set(content.to_string());
                tweet.author_id = Set(author_id);
                tweet.created_at = Set(now.into());
                (tweet.update(&txn).await?, false)
            }
            None => {
                let tweet = TweetActiveModel {
                    content: Set(content.to_string()),
                    created_at: Set(now.into()),
                    author_id: Set(author_id),
                    is_deleted: Set(false),
                    delete_reason: Set(String::new()),
                    parent_tweet_id: Set(None),
                    external_id: Set(Some(external_id.to_string())),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                (tweet, true)
            }
        };

        txn.commit().await?;

        debug!(tweet_id = tweet.id, external_id, created, "External tweet stored");
        Ok((tweet, created))
    }

    /// Tweets created strictly before `cutoff`, oldest id first
    pub async fn tweets_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Tweet>> {
        TweetEntity::find()
            .filter(TweetColumn::CreatedAt.lt(cutoff))
            .order_by_asc(TweetColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

async fn reply_ids<C: ConnectionTrait>(db: &C, parents: &[i32]) -> Result<Vec<i32>> {
    TweetEntity::find()
        .select_only()
        .column(TweetColumn::Id)
        .filter(TweetColumn::ParentTweetId.is_in(parents.to_vec()))
        .into_tuple::<i32>()
        .all(db)
        .await
        .map_err(Into::into)
}

async fn upsert_hashtag<C: ConnectionTrait>(db: &C, tag: &str) -> Result<Hashtag> {
    HashtagEntity::insert(HashtagActiveModel {
        tag: Set(tag.to_string()),
        ..Default::default()
    })
    .on_conflict(OnConflict::column(HashtagColumn::Tag).do_nothing().to_owned())
    .exec_without_returning(db)
    .await?;

    HashtagEntity::find()
        .filter(HashtagColumn::Tag.eq(tag))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal {
            message: format!("hashtag '{}' missing after upsert", tag),
        })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{member, post, reply, repo};
    use super::super::Member;
    use super::*;

    #[test]
    fn test_collect_hashtags() {
        let tags = collect_hashtags(
            "Loving #Rust and #rust, also #async_io!",
            &["#Tokio".to_string(), "".to_string()],
        );
        assert_eq!(tags, vec!["tokio", "rust", "async_io"]);
        assert!(collect_hashtags("no tags here", &[]).is_empty());
    }

    #[test]
    fn test_delete_reason_or_default() {
        assert_eq!(delete_reason_or_default(Some("Spam")), "Spam");
        assert_eq!(delete_reason_or_default(Some("  ")), DEFAULT_DELETE_REASON);
        assert_eq!(delete_reason_or_default(None), DEFAULT_DELETE_REASON);
    }

    #[tokio::test]
    async fn test_create_tweet_links_hashtags() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;

        let tweet = repo
            .create_tweet(
                alice.profile_id,
                NewTweet {
                    content: "Hello #World".to_string(),
                    parent_tweet_id: None,
                    hashtags: vec!["intro".to_string()],
                },
            )
            .await
            .unwrap();

        assert!(!tweet.is_deleted);
        assert_eq!(tweet.delete_reason, "");
        assert_eq!(repo.tweet_hashtags(tweet.id).await.unwrap(), vec!["intro", "world"]);

        // Existing tags are reused
        let again = post(&repo, &alice, "Still #world").await;
        assert_eq!(repo.tweet_hashtags(again.id).await.unwrap(), vec!["world"]);
        assert_eq!(HashtagEntity::find().all(repo.read_conn()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_to_missing_parent() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;

        let err = repo
            .create_tweet(
                alice.profile_id,
                NewTweet {
                    content: "orphan".to_string(),
                    parent_tweet_id: Some(999),
                    hashtags: Vec::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_cascades_to_nested_replies() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;

        let root = post(&repo, &alice, "Root tweet").await;
        let first = reply(&repo, &bob, &root, "Reply 1").await;
        let nested = reply(&repo, &alice, &first, "Nested reply").await;
        let second = reply(&repo, &bob, &root, "Reply 2").await;
        let other = post(&repo, &bob, "Unrelated").await;

        let stamped = repo.soft_delete_tweet(root.id, Some("Spam")).await.unwrap();
        assert_eq!(stamped, 4);

        let root = repo.find_tweet(root.id).await.unwrap().unwrap();
        assert!(root.is_deleted);
        assert_eq!(root.delete_reason, "Spam");

        for id in [first.id, nested.id, second.id] {
            let t = repo.find_tweet(id).await.unwrap().unwrap();
            assert!(t.is_deleted);
            assert_eq!(t.delete_reason, PARENT_DELETED_REASON);
        }

        let other = repo.find_tweet(other.id).await.unwrap().unwrap();
        assert!(!other.is_deleted);
    }

    #[tokio::test]
    async fn test_soft_delete_defaults_empty_reason() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let tweet = post(&repo, &alice, "Hello").await;

        repo.soft_delete_tweet(tweet.id, Some("")).await.unwrap();

        let tweet = repo.find_tweet(tweet.id).await.unwrap().unwrap();
        assert_eq!(tweet.delete_reason, DEFAULT_DELETE_REASON);
    }

    #[tokio::test]
    async fn test_soft_delete_twice_is_rejected() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let tweet = post(&repo, &alice, "Hello").await;

        repo.soft_delete_tweet(tweet.id, Some("Spam")).await.unwrap();
        let err = repo
            .soft_delete_tweet(tweet.id, Some("Inappropriate"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyDeleted { id } if id == tweet.id));

        let tweet = repo.find_tweet(tweet.id).await.unwrap().unwrap();
        assert_eq!(tweet.delete_reason, "Spam");
    }

    #[tokio::test]
    async fn test_soft_delete_restamps_deleted_reply() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let root = post(&repo, &alice, "Root").await;
        let child = reply(&repo, &alice, &root, "Child").await;

        repo.soft_delete_tweet(child.id, Some("Spam")).await.unwrap();
        repo.soft_delete_tweet(root.id, None).await.unwrap();

        let child = repo.find_tweet(child.id).await.unwrap().unwrap();
        assert_eq!(child.delete_reason, PARENT_DELETED_REASON);
    }

    #[tokio::test]
    async fn test_soft_delete_missing_tweet() {
        let repo = repo().await;
        let err = repo.soft_delete_tweet(42, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_hard_delete_removes_reply_chain() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;

        let root = post(&repo, &alice, "Root #tag").await;
        let first = reply(&repo, &bob, &root, "Reply").await;
        let nested = reply(&repo, &alice, &first, "Nested").await;
        let keep = post(&repo, &bob, "Keep me").await;
        repo.like(&bob, nested.id).await.unwrap();
        repo.retweet(&bob, root.id).await.unwrap();

        let deleted = repo.hard_delete_tweet(root.id).await.unwrap();
        assert_eq!(deleted, 3);

        for id in [root.id, first.id, nested.id] {
            assert!(repo.find_tweet(id).await.unwrap().is_none());
        }
        assert!(repo.find_tweet(keep.id).await.unwrap().is_some());
        assert!(LikeEntity::find().all(repo.read_conn()).await.unwrap().is_empty());
        assert!(RetweetEntity::find().all(repo.read_conn()).await.unwrap().is_empty());
        assert!(TweetHashtagEntity::find()
            .all(repo.read_conn())
            .await
            .unwrap()
            .is_empty());
    }

    async fn reply_chain(repo: &Repository, author: &Member, depth: usize) -> Vec<Tweet> {
        let mut chain = vec![post(repo, author, "Thread start").await];
        for n in 0..depth {
            let next = reply(repo, author, &chain[chain.len() - 1], &format!("Reply {}", n)).await;
            chain.push(next);
        }
        chain
    }

    #[tokio::test]
    async fn test_soft_delete_deep_reply_chain() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let chain = reply_chain(&repo, &alice, 300).await;

        let stamped = repo.soft_delete_tweet(chain[0].id, Some("Spam")).await.unwrap();
        assert_eq!(stamped, 301);

        let tweets = repo.list_tweets(None).await.unwrap();
        assert_eq!(tweets.len(), 301);
        assert!(tweets.iter().all(|t| t.is_deleted));
        let last = tweets.iter().find(|t| t.id == chain[300].id).unwrap();
        assert_eq!(last.delete_reason, PARENT_DELETED_REASON);
    }

    #[tokio::test]
    async fn test_hard_delete_deep_reply_chain() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let chain = reply_chain(&repo, &alice, 300).await;
        let keep = post(&repo, &alice, "Separate").await;

        let deleted = repo.hard_delete_tweet(chain[0].id).await.unwrap();
        assert_eq!(deleted, 301);

        let remaining = repo.list_tweets(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_hard_delete_missing_tweet() {
        let repo = repo().await;
        let err = repo.hard_delete_tweet(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_upsert_external_tweet() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;

        let (first, created) = repo
            .upsert_external_tweet(alice.profile_id, "1", "first body")
            .await
            .unwrap();
        assert!(created);

        let (second, created) = repo
            .upsert_external_tweet(alice.profile_id, "1", "edited body")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "edited body");
        assert_eq!(repo.list_tweets(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_tweets_newest_first() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let older = post(&repo, &alice, "older").await;
        let newer = post(&repo, &alice, "newer").await;
        repo.soft_delete_tweet(older.id, None).await.unwrap();

        let tweets = repo.list_tweets(None).await.unwrap();
        assert_eq!(tweets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert!(tweets[1].is_deleted);

        let page = repo.list_tweets(Some(Page::new(Some(1), Some(1)))).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, older.id);
    }
}
