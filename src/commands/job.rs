//! `reprolab job` handlers

use super::status_label;
use crate::backend::{BackendClient, RemoteJobStatusSource};
use crate::config::Config;
use crate::error::{Result, ReprolabError};
use crate::jobs::{
    format_elapsed, JobId, JobPoller, JobSnapshot, JobStatus, JobStatusRecord, JobStatusSource,
    PollOutcome,
};
use chrono::Utc;
use std::sync::Arc;

fn status_source(config: &Config) -> Result<RemoteJobStatusSource> {
    let backend = BackendClient::new(&config.backend)?;
    Ok(RemoteJobStatusSource::new(backend, &config.jobs.table))
}

/// Follow a job until it reaches a terminal status or Ctrl-C is pressed
///
/// # Errors
///
/// Returns setup errors, and `ReprolabError::JobFailed` when the job ends
/// as failed so the process exits non-zero.
pub async fn watch_job(config: &Config, id: String) -> Result<()> {
    let poller = JobPoller::from_config(Arc::new(status_source(config)?), &config.jobs);
    let mut subscription = poller.subscribe(Some(JobId::from(id.clone())));
    let mut updates = subscription.watch();

    tracing::info!(
        "Watching job {} every {}ms",
        id,
        poller.interval().as_millis()
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot);
                if snapshot.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping job watch");
                subscription.cancel();
                break;
            }
        }
    }

    match subscription.finished().await {
        PollOutcome::Terminal(JobStatus::Failed) => {
            Err(ReprolabError::JobFailed(id).into())
        }
        outcome => {
            tracing::debug!("Job watch ended: {:?}", outcome);
            Ok(())
        }
    }
}

/// Fetch and print a job's status once
pub async fn show_job_status(config: &Config, id: String, json: bool) -> Result<()> {
    let source = status_source(config)?;
    let record = source.fetch_status(&JobId::from(id.clone())).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", describe(&id, &record));
    }
    Ok(())
}

fn print_snapshot(snapshot: &JobSnapshot) {
    let id = snapshot
        .job_id
        .as_ref()
        .map(JobId::to_string)
        .unwrap_or_default();

    if let Some(error) = &snapshot.error {
        eprintln!("{}: fetch failed: {}", id, error);
        return;
    }
    if let Some(record) = &snapshot.record {
        println!("{}", describe(&id, record));
    }
}

fn describe(id: &str, record: &JobStatusRecord) -> String {
    match record.elapsed_seconds(Utc::now()) {
        Some(seconds) => format!(
            "{} {} ({})",
            id,
            status_label(&record.status),
            format_elapsed(seconds)
        ),
        None => format!("{} {}", id, status_label(&record.status)),
    }
}
