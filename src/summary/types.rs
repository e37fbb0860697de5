//! Types shared by the daily summary resolver and its storage/generator seams

use crate::error::{Result, ReprolabError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cache key: one summary per client per calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    /// Client the summary was generated for
    pub client_id: String,
    /// Calendar day in the caller's local time zone
    pub summary_date: NaiveDate,
}

impl SummaryKey {
    /// Key for `client_id` on `summary_date`
    pub fn new(client_id: impl Into<String>, summary_date: NaiveDate) -> Self {
        Self {
            client_id: client_id.into(),
            summary_date,
        }
    }
}

/// A cached summary row as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummaryCacheEntry {
    /// Generated natural-language summary
    pub summary: String,
    /// When the generator produced the summary
    pub generated_at: DateTime<Utc>,
}

/// Caller-assembled context forwarded verbatim to the generator
///
/// The resolver never inspects these values. Field names match the
/// generator's payload keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryContext {
    /// Receptor/animal counts
    #[serde(default)]
    pub receptoras: serde_json::Value,
    /// Upcoming services (transfers, diagnoses, sexing)
    #[serde(default)]
    pub proximos_servicos: serde_json::Value,
    /// Most recent results
    #[serde(default)]
    pub ultimos_resultados: serde_json::Value,
    /// Embryo/semen inventory
    #[serde(default)]
    pub estoque: serde_json::Value,
    /// Farms belonging to the client
    #[serde(default)]
    pub fazendas: serde_json::Value,
}

/// Input to [`DailySummaryResolver::resolve`](super::DailySummaryResolver::resolve)
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    /// Client identifier; must not be blank
    pub client_id: String,
    /// Human-readable client name passed to the generator
    pub client_name: String,
    /// Context bundle forwarded to the generator on a miss
    pub context: SummaryContext,
}

impl SummaryRequest {
    pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            context: SummaryContext::default(),
        }
    }

    pub fn with_context(mut self, context: SummaryContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(
                ReprolabError::InvalidInput("client id cannot be empty".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// Payload sent to the remote summary generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorPayload {
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "cliente_nome")]
    pub client_name: String,
    /// Local date, `YYYY-MM-DD`
    #[serde(rename = "data")]
    pub date: String,
    /// Local time, `HH:MM`
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(flatten)]
    pub context: SummaryContext,
}

/// Generator reply: `{success: true, summary, generated_at}` or `{success: false, error}`
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorResponse {
    pub success: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GeneratorResponse {
    /// Convert an application-level reply into a cache entry
    ///
    /// `received_at` stands in for a missing `generated_at`.
    ///
    /// # Errors
    ///
    /// Returns `ReprolabError::Generation` when `success` is false or the
    /// summary text is missing.
    pub fn into_entry(self, received_at: DateTime<Utc>) -> Result<DailySummaryCacheEntry> {
        if !self.success {
            let message = self
                .error
                .unwrap_or_else(|| "generator reported failure".to_string());
            return Err(ReprolabError::Generation(message).into());
        }

        let summary = self.summary.ok_or_else(|| {
            ReprolabError::Generation("generator response has no summary".to_string())
        })?;

        Ok(DailySummaryCacheEntry {
            summary,
            generated_at: self.generated_at.unwrap_or(received_at),
        })
    }
}

/// Result of a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    /// Served from the cache rather than freshly generated; informational only
    pub from_cache: bool,
}

impl DailySummary {
    pub(crate) fn cached(entry: DailySummaryCacheEntry) -> Self {
        Self {
            summary: entry.summary,
            generated_at: entry.generated_at,
            from_cache: true,
        }
    }

    pub(crate) fn generated(entry: DailySummaryCacheEntry) -> Self {
        Self {
            summary: entry.summary,
            generated_at: entry.generated_at,
            from_cache: false,
        }
    }
}
