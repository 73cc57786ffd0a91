//! Flock Scheduler
//!
//! Runs the periodic jobs against the shared database:
//! 1. Pulls posts from the upstream source and upserts them as tweets
//! 2. Archives tweets past the backup period to a file, then removes them
//!
//! `scheduler once` runs each job a single time and exits.

mod runner;

use crate::runner::Scheduler;
use flock_common::{
    config::AppConfig,
    db::{schema, DbPool},
    jobs::HttpPostSource,
    runtime, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    runtime::init_tracing(&config.observability);
    info!("Starting Flock Scheduler v{}", VERSION);

    runtime::install_metrics(config.observability.metrics_port)?;

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        schema::create_all(db.write()).await?;
    }

    let source = HttpPostSource::new(
        config.jobs.source_url.clone(),
        Duration::from_secs(config.jobs.source_timeout_secs),
    )?;
    info!(url = %config.jobs.source_url, "Post source configured");

    let scheduler = Scheduler::new(db, Arc::new(source), config.jobs.clone());

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("once") {
        info!("Running each job once...");
        let fetched = scheduler.run_fetch().await;
        let archived = scheduler.run_backup().await;
        if !(fetched && archived) {
            std::process::exit(1);
        }
        return Ok(());
    }

    scheduler.run_until(runtime::shutdown_signal()).await;

    info!("Scheduler shutting down");
    Ok(())
}
