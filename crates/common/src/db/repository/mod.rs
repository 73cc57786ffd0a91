//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support. The operations are
//! grouped by concern:
//! - `accounts`: accounts, profiles and member lookup
//! - `tweets`: the tweet lifecycle (create, soft delete, hard delete)
//! - `graph`: follow edges and notifications
//! - `feed`: timeline assembly
//! - `reactions`: likes and retweets
//! - `stats`: aggregation queries

mod accounts;
mod feed;
mod graph;
mod reactions;
mod stats;
mod tweets;

pub use graph::follow_message;
pub use reactions::ReactionCounts;
pub use stats::{
    ActiveUser, DeletionReasonCount, HashtagCount, ACTIVE_USERS_LIMIT, POPULAR_WINDOW_DAYS,
};
pub use tweets::{collect_hashtags, delete_reason_or_default, NewTweet};

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u64 = 200;

/// A profile together with the account name it is known by.
///
/// Used both for the authenticated caller and for the target of a social
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub profile_id: i32,
    pub username: String,
}

/// Offset/limit window over an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    /// Build a page, clamping the limit into `1..=MAX_PAGE_SIZE`
    pub fn new(offset: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// True when the store rejected a write on a unique key
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
