//! Scheduled job bodies
//!
//! Both jobs are plain async functions over a [`Repository`]; the
//! `flock-scheduler` binary drives them on intervals, but any timer can.

mod source;

pub use source::{ExternalPost, HttpPostSource, PostSource, StaticPostSource};

use crate::db::Repository;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub const FETCH_JOB: &str = "fetch_and_update_tweets";
pub const BACKUP_JOB: &str = "backup_and_delete_old_tweets";

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    /// Posts whose account does not exist
    pub skipped: usize,
}

/// Outcome of one archival run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    /// Lines written to the backup file
    pub archived: usize,
    /// Tweets removed, replies included
    pub deleted: u64,
}

/// Pull posts from `source` and upsert them as tweets.
///
/// A post is keyed by its upstream id, and its author is the account with
/// the post's `userId`. Accounts without a profile get one.
pub async fn fetch_and_update_tweets(
    repo: &Repository,
    source: &dyn PostSource,
) -> Result<IngestReport> {
    let posts = source.fetch_posts().await?;
    let mut report = IngestReport {
        fetched: posts.len(),
        ..Default::default()
    };

    for post in posts {
        let Some(account) = repo.find_account_by_id(post.user_id).await? else {
            warn!(user_id = post.user_id, post_id = post.id, "Skipping post for unknown account");
            report.skipped += 1;
            continue;
        };

        let profile = repo.ensure_profile(account.id).await?;
        let (_, created) = repo
            .upsert_external_tweet(profile.id, &post.id.to_string(), &post.body)
            .await?;

        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }

    info!(
        source = %source.describe(),
        fetched = report.fetched,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "Tweets ingested"
    );
    Ok(report)
}

/// Append every tweet older than `older_than_days` to `path` as
/// `"{id}, {content}"` lines, then hard-delete it with its replies.
pub async fn backup_and_delete_old_tweets(
    repo: &Repository,
    older_than_days: u32,
    path: &Path,
) -> Result<ArchiveReport> {
    let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
    let tweets = repo.tweets_created_before(cutoff).await?;
    let mut report = ArchiveReport::default();

    if tweets.is_empty() {
        info!(cutoff = %cutoff, "No tweets to archive");
        return Ok(report);
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    for tweet in &tweets {
        file.write_all(format!("{}, {}\n", tweet.id, tweet.content).as_bytes())
            .await?;
        report.archived += 1;
    }
    file.flush().await?;

    for tweet in &tweets {
        match repo.hard_delete_tweet(tweet.id).await {
            Ok(rows) => report.deleted += rows,
            // Already removed with an archived ancestor
            Err(AppError::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    info!(
        cutoff = %cutoff,
        path = %path.display(),
        archived = report.archived,
        deleted = report.deleted,
        "Old tweets archived"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbPool, NewTweet};

    async fn repo() -> Repository {
        Repository::new(DbPool::in_memory().await.unwrap())
    }

    fn post(user_id: i32, id: i64, body: &str) -> ExternalPost {
        ExternalPost {
            user_id,
            id,
            body: body.to_string(),
        }
    }

    fn temp_backup_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("flock-backup-{}.txt", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_fetch_upserts_by_external_id() {
        let repo = repo().await;
        let (account, _) = repo.create_account("alice", "hash", "").await.unwrap();

        let source = StaticPostSource::new(vec![
            post(account.id, 1, "first"),
            post(account.id, 2, "second"),
            post(999, 3, "nobody"),
        ]);
        let report = fetch_and_update_tweets(&repo, &source).await.unwrap();
        assert_eq!(
            report,
            IngestReport { fetched: 3, created: 2, updated: 0, skipped: 1 }
        );

        let source = StaticPostSource::new(vec![post(account.id, 1, "first, edited")]);
        let report = fetch_and_update_tweets(&repo, &source).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);

        let tweets = repo.list_tweets(None).await.unwrap();
        assert_eq!(tweets.len(), 2);
        assert!(tweets.iter().any(|t| t.content == "first, edited"));
    }

    #[tokio::test]
    async fn test_backup_writes_then_deletes() {
        let repo = repo().await;
        let (_, profile) = repo.create_account("alice", "hash", "").await.unwrap();

        let root = repo
            .create_tweet(profile.id, NewTweet::text("old root"))
            .await
            .unwrap();
        let child = repo
            .create_tweet(
                profile.id,
                NewTweet {
                    content: "old reply".to_string(),
                    parent_tweet_id: Some(root.id),
                    hashtags: Vec::new(),
                },
            )
            .await
            .unwrap();

        let path = temp_backup_path();
        let report = backup_and_delete_old_tweets(&repo, 0, &path).await.unwrap();
        assert_eq!(report, ArchiveReport { archived: 2, deleted: 2 });

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            contents,
            format!("{}, old root\n{}, old reply\n", root.id, child.id)
        );
        assert!(repo.list_tweets(None).await.unwrap().is_empty());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_backup_keeps_recent_tweets() {
        let repo = repo().await;
        let (_, profile) = repo.create_account("alice", "hash", "").await.unwrap();
        repo.create_tweet(profile.id, NewTweet::text("fresh"))
            .await
            .unwrap();

        let path = temp_backup_path();
        let report = backup_and_delete_old_tweets(&repo, 30, &path).await.unwrap();
        assert_eq!(report, ArchiveReport::default());
        assert!(!path.exists());
        assert_eq!(repo.list_tweets(None).await.unwrap().len(), 1);
    }
}
