//! Job queue table reads over the backend

use super::BackendClient;
use crate::error::{Result, ReprolabError};
use crate::jobs::{JobId, JobStatusRecord, JobStatusSource};
use async_trait::async_trait;

/// [`JobStatusSource`] reading the analysis queue table by `id`
pub struct RemoteJobStatusSource {
    client: BackendClient,
    table: String,
}

impl RemoteJobStatusSource {
    pub fn new(client: BackendClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl JobStatusSource for RemoteJobStatusSource {
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatusRecord> {
        let rows: Vec<JobStatusRecord> = self
            .client
            .select(
                &self.table,
                &[
                    ("select", "status,started_at,completed_at".to_string()),
                    ("id", format!("eq.{}", job_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        rows.into_iter().next().ok_or_else(|| {
            ReprolabError::NotFound(format!("job {} in {}", job_id, self.table)).into()
        })
    }
}
