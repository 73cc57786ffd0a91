//! Aggregation queries

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;

/// Default trailing window for [`Repository::popular_hashtags`]
pub const POPULAR_WINDOW_DAYS: u32 = 7;

/// Default size of [`Repository::active_users`]
pub const ACTIVE_USERS_LIMIT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReasonCount {
    pub reason: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashtagCount {
    #[serde(rename = "hashtag")]
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUser {
    pub username: String,
    pub last_login: DateTimeWithTimeZone,
}

impl Repository {
    /// Deleted tweets created within `[start, end]`, counted per reason.
    ///
    /// Ordered by count descending, then reason.
    pub async fn deletion_statistics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DeletionReasonCount>> {
        let tweet_count = || Expr::col((TweetEntity, TweetColumn::Id)).count();

        let rows: Vec<(String, i64)> = TweetEntity::find()
            .select_only()
            .column(TweetColumn::DeleteReason)
            .column_as(tweet_count(), "count")
            .filter(TweetColumn::IsDeleted.eq(true))
            .filter(TweetColumn::CreatedAt.between(start, end))
            .group_by(TweetColumn::DeleteReason)
            .order_by_desc(tweet_count())
            .order_by_asc(TweetColumn::DeleteReason)
            .into_tuple()
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(reason, count)| DeletionReasonCount { reason, count })
            .collect())
    }

    /// Hashtags ranked by how many tweets used them in the last
    /// `window_days` days. Deleted tweets still count.
    pub async fn popular_hashtags(&self, window_days: u32) -> Result<Vec<HashtagCount>> {
        let cutoff = Utc::now() - Duration::days(i64::from(window_days));
        let tweet_count = || Expr::col((TweetEntity, TweetColumn::Id)).count();

        let rows: Vec<(String, i64)> = HashtagEntity::find()
            .select_only()
            .column(HashtagColumn::Tag)
            .column_as(tweet_count(), "count")
            .join(JoinType::InnerJoin, HashtagRelation::TweetHashtags.def())
            .join(JoinType::InnerJoin, TweetHashtagRelation::Tweet.def())
            .filter(TweetColumn::CreatedAt.gte(cutoff))
            .group_by(HashtagColumn::Tag)
            .order_by_desc(tweet_count())
            .order_by_asc(HashtagColumn::Tag)
            .into_tuple()
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(tag, count)| HashtagCount { tag, count })
            .collect())
    }

    /// Accounts that have logged in, most recent first
    pub async fn active_users(&self, limit: u64) -> Result<Vec<ActiveUser>> {
        let accounts = AccountEntity::find()
            .filter(AccountColumn::LastLogin.is_not_null())
            .order_by_desc(AccountColumn::LastLogin)
            .order_by_asc(AccountColumn::Username)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok(accounts
            .into_iter()
            .filter_map(|a| {
                a.last_login.map(|last_login| ActiveUser {
                    username: a.username,
                    last_login,
                })
            })
            .collect())
    }
}
