//! Interval loop driving the scheduled jobs

use flock_common::{
    config::JobsConfig,
    db::{DbPool, Repository},
    jobs::{self, PostSource, BACKUP_JOB, FETCH_JOB},
    metrics,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

/// Shortest period either job may run at
const MIN_PERIOD: Duration = Duration::from_secs(1);

pub struct Scheduler {
    repository: Repository,
    source: Arc<dyn PostSource>,
    config: JobsConfig,
}

impl Scheduler {
    pub fn new(db_pool: DbPool, source: Arc<dyn PostSource>, config: JobsConfig) -> Self {
        Self {
            repository: Repository::new(db_pool),
            source,
            config,
        }
    }

    /// One ingestion run; failures are logged and counted, never raised
    #[instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn run_fetch(&self) -> bool {
        match jobs::fetch_and_update_tweets(&self.repository, self.source.as_ref()).await {
            Ok(_) => {
                metrics::record_job_run(FETCH_JOB, true);
                true
            }
            Err(e) => {
                error!(error = %e, "Ingestion run failed");
                metrics::record_job_run(FETCH_JOB, false);
                false
            }
        }
    }

    /// One archival run; failures are logged and counted, never raised
    #[instrument(skip(self), fields(path = %self.config.backup_path))]
    pub async fn run_backup(&self) -> bool {
        let path = PathBuf::from(&self.config.backup_path);
        let result = jobs::backup_and_delete_old_tweets(
            &self.repository,
            self.config.backup_period_days,
            &path,
        )
        .await;

        match result {
            Ok(report) => {
                metrics::record_job_run(BACKUP_JOB, true);
                metrics::record_tweets_deleted("hard", report.deleted);
                true
            }
            Err(e) => {
                error!(error = %e, "Archival run failed");
                metrics::record_job_run(BACKUP_JOB, false);
                false
            }
        }
    }

    /// Run both jobs on their own intervals until `shutdown` resolves.
    /// Each job runs once immediately.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        let mut fetch = interval(self.config.fetch_interval().max(MIN_PERIOD));
        let mut backup = interval(self.config.backup_interval().max(MIN_PERIOD));
        fetch.set_missed_tick_behavior(MissedTickBehavior::Skip);
        backup.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            fetch_every = ?fetch.period(),
            backup_every = ?backup.period(),
            "Scheduler running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = fetch.tick() => {
                    self.run_fetch().await;
                }
                _ = backup.tick() => {
                    self.run_backup().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_common::jobs::{ExternalPost, StaticPostSource};

    async fn scheduler_with_account() -> (Scheduler, Repository, i32) {
        let pool = DbPool::in_memory().await.unwrap();
        let repo = Repository::new(pool.clone());
        let (account, _) = repo.create_account("alice", "hash", "").await.unwrap();

        let source = StaticPostSource::new(vec![ExternalPost {
            user_id: account.id,
            id: 1,
            body: "from upstream".to_string(),
        }]);

        let config = JobsConfig {
            backup_path: std::env::temp_dir()
                .join("flock-scheduler-test-unused.txt")
                .display()
                .to_string(),
            ..JobsConfig::default()
        };

        (Scheduler::new(pool, Arc::new(source), config), repo, account.id)
    }

    #[tokio::test]
    async fn test_run_fetch_ingests() {
        let (scheduler, repo, _) = scheduler_with_account().await;

        assert!(scheduler.run_fetch().await);
        let tweets = repo.list_tweets(None).await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].external_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_run_until_runs_jobs_then_stops() {
        let (scheduler, repo, _) = scheduler_with_account().await;

        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(200)))
            .await;

        // Fresh tweets survive the 30-day archival run
        let tweets = repo.list_tweets(None).await.unwrap();
        assert_eq!(tweets.len(), 1);
    }
}
