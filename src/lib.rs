//! foisync - Historic FOIS freight-operations fetcher
//!
//! Pulls past days of FOIS dashboard data for one zone and stores it in
//! date-keyed tables without writing the same day twice.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`api`] - Endpoint registry, token lifecycle, call pacing and fetching
//! - [`storage`] - Destination tables and the dedup writer
//! - [`orchestrator`] - Day × endpoint run sequencing and cleanup
//! - [`models`] - Core data structures and types
//! - [`utils`] - Date helpers, retry policy and component errors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use foisync::config::Config;
//! use foisync::orchestrator::{FetchOrchestrator, FetchPlan};
//! use foisync::storage::SqliteTableRepository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let plan = FetchPlan::from_args("7", None, chrono::Local::now().date_naive())?;
//!     let repo = Arc::new(SqliteTableRepository::new(&config.store.id)?);
//!     let summary = FetchOrchestrator::from_config(&config, repo)?.run(&plan).await?;
//!     println!("{} tasks, {} calls", summary.tasks, summary.api_calls);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{
        AuthManager, Credential, Endpoint, RateLimiter, RatePolicy, RemoteFetcher,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, FoisErrorTrait, Result};
    pub use crate::models::{FetchTask, RecordSet, RunSummary, TaskOutcome};
    pub use crate::orchestrator::{FetchOrchestrator, FetchPlan};
    pub use crate::storage::{DedupWriter, SqliteTableRepository, TableRepository, WriteOutcome};
}

// Direct re-exports for convenience
pub use models::{FetchTask, RecordSet, RunSummary, TaskOutcome};
