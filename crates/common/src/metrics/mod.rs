//! Metrics and observability utilities
//!
//! Counters for the tweet lifecycle, the social graph and the scheduled
//! jobs, plus a request latency histogram. Everything goes through the
//! `metrics` facade; the binaries install the Prometheus exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Flock metrics
pub const METRICS_PREFIX: &str = "flock";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_tweets_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total tweets created through the API"
    );

    describe_counter!(
        format!("{}_tweets_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Tweets removed, by mode (soft or hard), including cascaded replies"
    );

    describe_counter!(
        format!("{}_follows_total", METRICS_PREFIX),
        Unit::Count,
        "Total follow edges created"
    );

    describe_counter!(
        format!("{}_reactions_total", METRICS_PREFIX),
        Unit::Count,
        "Likes and retweets, by kind"
    );

    describe_counter!(
        format!("{}_job_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Scheduled job runs, by job and status"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_tweet_created() {
    counter!(format!("{}_tweets_created_total", METRICS_PREFIX)).increment(1);
}

/// `mode` is "soft" or "hard"; `rows` counts the whole cascade
pub fn record_tweets_deleted(mode: &'static str, rows: u64) {
    counter!(
        format!("{}_tweets_deleted_total", METRICS_PREFIX),
        "mode" => mode
    )
    .increment(rows);
}

pub fn record_follow() {
    counter!(format!("{}_follows_total", METRICS_PREFIX)).increment(1);
}

/// `kind` is "like" or "retweet"
pub fn record_reaction(kind: &'static str) {
    counter!(
        format!("{}_reactions_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_job_run(job: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_job_runs_total", METRICS_PREFIX),
        "job" => job,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call is a no-op
        register_metrics();
        RequestMetrics::start("GET", "/api/feed").finish(200);
        record_tweet_created();
        record_tweets_deleted("soft", 3);
        record_follow();
        record_reaction("like");
        record_job_run("fetch_and_update_tweets", true);
    }
}
