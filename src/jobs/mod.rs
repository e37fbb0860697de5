//! Embryo-analysis job status polling
//!
//! The analysis queue is owned by an external worker. This module only
//! reads a queue entry's status: [`JobPoller`] fetches it at a fixed
//! interval until the job is completed or failed, publishing every fetch to
//! a [`JobSubscription`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod poller;
pub use poller::{JobPoller, JobSnapshot, JobSubscription, PollOutcome};

/// Identifier of a queue entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a queue entry identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent in `id=eq.<id>` filters
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Queue entry status
///
/// `queued -> running -> {completed | failed}`. The worker also writes
/// `pending` and `processing`, which map to queued and running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    /// Any value the worker writes that this client does not know
    Unknown(String),
}

impl JobStatus {
    /// Completed and failed never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown(raw) => raw,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "queued" | "pending" => JobStatus::Queued,
            "running" | "processing" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown(raw),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        JobStatus::from(raw.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of a queue entry this client reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub status: JobStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusRecord {
    pub fn new(status: impl Into<JobStatus>) -> Self {
        Self {
            status: status.into(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Seconds the job has been running
    ///
    /// Measured from `started_at` to `completed_at`, or to `now` while the
    /// job is still open. `None` before the worker has started it. Clock
    /// skew never yields a negative value.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or(now);
        let seconds = (end - started).num_seconds();
        Some(u64::try_from(seconds).unwrap_or(0))
    }
}

/// Source of job status rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Fetch the single row for `job_id`
    ///
    /// A missing row is an error (`ReprolabError::NotFound`), not `None`.
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatusRecord>;
}

/// Format elapsed seconds as `M:SS`
///
/// Minutes are unbounded; seconds are zero-padded.
///
/// # Examples
///
/// ```
/// use reprolab::jobs::format_elapsed;
///
/// assert_eq!(format_elapsed(75), "1:15");
/// assert_eq!(format_elapsed(5), "0:05");
/// assert_eq!(format_elapsed(600), "10:00");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
