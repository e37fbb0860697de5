/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `summary`: resolve today's summary for a client
- `job`: follow or inspect an embryo-analysis job

Handlers build the backend client from configuration and delegate to the
`summary` and `jobs` library modules.
*/

pub mod job;
pub mod summary;

use crate::jobs::JobStatus;
use colored::Colorize;

/// Colored label for a job status
pub(crate) fn status_label(status: &JobStatus) -> String {
    match status {
        JobStatus::Queued => "QUEUED".yellow().to_string(),
        JobStatus::Running => "RUNNING".cyan().to_string(),
        JobStatus::Completed => "COMPLETED".green().to_string(),
        JobStatus::Failed => "FAILED".red().to_string(),
        JobStatus::Unknown(raw) => raw.to_uppercase().dimmed().to_string(),
    }
}
