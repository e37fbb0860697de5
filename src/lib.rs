//! Reprolab - reproduction management client library
//!
//! This library provides the client core of a livestock reproduction
//! management application whose data lives in a hosted database service:
//! cached daily summaries and embryo-analysis job polling.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `summary`: Cache-or-compute resolver for a client's daily summary
//! - `jobs`: Job status types, fixed-interval poller and elapsed formatting
//! - `backend`: HTTP client for the hosted tables and functions
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use reprolab::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod jobs;
pub mod summary;

// Re-export commonly used types
pub use config::Config;
pub use error::{ReprolabError, Result};
pub use jobs::{format_elapsed, JobPoller, JobStatus, JobSubscription};
pub use summary::{DailySummary, DailySummaryResolver, SummaryRequest};
