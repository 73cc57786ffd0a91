//! Upstream post sources for the ingestion job

use crate::errors::Result;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// A post as published by the upstream API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPost {
    /// Account the post belongs to
    #[serde(rename = "userId")]
    pub user_id: i32,

    pub id: i64,

    pub body: String,
}

/// Anything that can list upstream posts
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<ExternalPost>>;

    /// Human-readable origin, used in logs
    fn describe(&self) -> String;
}

/// JSON-over-HTTP source with exponential backoff on transient failures
pub struct HttpPostSource {
    client: reqwest::Client,
    url: String,
    max_elapsed: Duration,
}

impl HttpPostSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            max_elapsed: timeout * 4,
        })
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch_posts(&self) -> Result<Vec<ExternalPost>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();

        let posts = retry(policy, || async {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                warn!(url = %self.url, error = %e, "Post source unreachable, retrying");
                backoff::Error::transient(e)
            })?;

            // Client errors will not fix themselves
            let response = response.error_for_status().map_err(|e| match e.status() {
                Some(status) if status.is_client_error() => backoff::Error::permanent(e),
                _ => backoff::Error::transient(e),
            })?;

            response
                .json::<Vec<ExternalPost>>()
                .await
                .map_err(backoff::Error::permanent)
        })
        .await?;

        Ok(posts)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Fixed list of posts, for local runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticPostSource {
    posts: Vec<ExternalPost>,
}

impl StaticPostSource {
    pub fn new(posts: Vec<ExternalPost>) -> Self {
        Self { posts }
    }
}

#[async_trait]
impl PostSource for StaticPostSource {
    async fn fetch_posts(&self) -> Result<Vec<ExternalPost>> {
        Ok(self.posts.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} posts)", self.posts.len())
    }
}
