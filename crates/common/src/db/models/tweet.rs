//! Tweet entity
//!
//! Tweets form a reply tree through `parent_tweet_id`. The parent key has
//! no database-level cascade: the repository removes replies itself,
//! deepest first.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Length of the plain-text preview
pub const PREVIEW_CHARS: usize = 140;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tweets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(indexed)]
    pub author_id: i32,

    pub is_deleted: bool,

    /// Empty until the tweet is soft-deleted
    #[sea_orm(column_type = "Text")]
    pub delete_reason: String,

    #[sea_orm(indexed)]
    pub parent_tweet_id: Option<i32>,

    /// Upstream identifier for ingested tweets
    #[sea_orm(column_type = "Text", nullable)]
    pub external_id: Option<String>,
}

impl Model {
    /// Two tweets are the same post when author and text match,
    /// regardless of identity or lifecycle state.
    pub fn content_eq(&self, other: &Model) -> bool {
        self.content == other.content && self.author_id == other.author_id
    }

    /// First 140 characters of the content
    pub fn preview(&self) -> &str {
        match self.content.char_indices().nth(PREVIEW_CHARS) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }

    /// Debug-style label, e.g. `<Tweet 7 by alice>`
    pub fn describe(&self, author_name: &str) -> String {
        format!("<Tweet {} by {}>", self.id, author_name)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_tweet_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::AuthorId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentTweetId",
        to = "Column::Id"
    )]
    Parent,

    #[sea_orm(has_many = "super::tweet_hashtag::Entity")]
    TweetHashtags,

    #[sea_orm(has_many = "super::like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::retweet::Entity")]
    Retweets,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::tweet_hashtag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TweetHashtags.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::retweet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Retweets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tweet(id: i32, author_id: i32, content: &str) -> Model {
        Model {
            id,
            content: content.to_string(),
            created_at: Utc::now().into(),
            author_id,
            is_deleted: false,
            delete_reason: String::new(),
            parent_tweet_id: None,
            external_id: None,
        }
    }

    #[test]
    fn test_content_eq_ignores_identity() {
        let a = tweet(1, 10, "Hello world! This is a test tweet.");
        let b = tweet(2, 10, "Another test tweet for comparison.");
        let c = tweet(3, 10, "Hello world! This is a test tweet.");
        let d = tweet(4, 11, "Hello world! This is a test tweet.");

        assert!(a.content_eq(&c));
        assert!(!a.content_eq(&b));
        assert!(!a.content_eq(&d));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let short = tweet(1, 1, "Hello world! This is a test tweet.");
        assert_eq!(short.preview(), "Hello world! This is a test tweet.");

        let long = tweet(2, 1, &"é".repeat(200));
        assert_eq!(long.preview().chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn test_describe() {
        let t = tweet(7, 1, "hi");
        assert_eq!(t.describe("alice"), "<Tweet 7 by alice>");
    }
}
