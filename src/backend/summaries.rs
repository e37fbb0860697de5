//! Summary cache table and generator function over the backend

use super::BackendClient;
use crate::error::Result;
use crate::summary::{
    DailySummaryCacheEntry, GeneratorPayload, GeneratorResponse, SummaryCache, SummaryGenerator,
    SummaryKey,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Upsert body for the summary table
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    client_id: &'a str,
    summary_date: NaiveDate,
    summary: &'a str,
    generated_at: DateTime<Utc>,
}

/// [`SummaryCache`] backed by a table unique on `(client_id, summary_date)`
pub struct RemoteSummaryCache {
    client: BackendClient,
    table: String,
}

impl RemoteSummaryCache {
    pub fn new(client: BackendClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl SummaryCache for RemoteSummaryCache {
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummaryCacheEntry>> {
        let rows: Vec<DailySummaryCacheEntry> = self
            .client
            .select(
                &self.table,
                &[
                    ("select", "summary,generated_at".to_string()),
                    ("client_id", format!("eq.{}", key.client_id)),
                    ("summary_date", format!("eq.{}", key.summary_date)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn put(&self, key: &SummaryKey, entry: &DailySummaryCacheEntry) -> Result<()> {
        let row = SummaryRow {
            client_id: &key.client_id,
            summary_date: key.summary_date,
            summary: &entry.summary,
            generated_at: entry.generated_at,
        };
        self.client
            .upsert(&self.table, "client_id,summary_date", &[row])
            .await
    }
}

/// [`SummaryGenerator`] that invokes a backend function
pub struct RemoteSummaryGenerator {
    client: BackendClient,
    function: String,
}

impl RemoteSummaryGenerator {
    pub fn new(client: BackendClient, function: impl Into<String>) -> Self {
        Self {
            client,
            function: function.into(),
        }
    }
}

#[async_trait]
impl SummaryGenerator for RemoteSummaryGenerator {
    async fn generate(&self, payload: &GeneratorPayload) -> Result<DailySummaryCacheEntry> {
        let response: GeneratorResponse = self.client.invoke(&self.function, payload).await?;
        response.into_entry(Utc::now())
    }
}
