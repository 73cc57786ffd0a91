//! Flock Common Library
//!
//! Shared code for the Flock services including:
//! - Database entities and the repository (tweet lifecycle, social graph,
//!   feed and aggregation queries)
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Scheduled job bodies (ingestion and archival)
//! - Metrics and observability, plus the shared process bootstrap

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod metrics;
pub mod runtime;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reason stamped on a root tweet when the caller gives none
pub const DEFAULT_DELETE_REASON: &str = "No reason provided";

/// Reason stamped on every reply removed by a parent's deletion
pub const PARENT_DELETED_REASON: &str = "Parent tweet deleted";
