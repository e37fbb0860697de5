//! HTTP client for the hosted backend
//!
//! The backend serves tables through a PostgREST-style API under
//! `rest/v1/<table>` and invocable functions under `functions/v1/<name>`.
//! Every request carries the project API key both as `apikey` and as a
//! bearer token.
//!
//! [`BackendClient`] is the transport; [`RemoteSummaryCache`],
//! [`RemoteSummaryGenerator`] and [`RemoteJobStatusSource`] implement the
//! summary and job seams on top of it.

use crate::config::BackendConfig;
use crate::error::{Result, ReprolabError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub mod jobs;
pub mod summaries;

pub use jobs::RemoteJobStatusSource;
pub use summaries::{RemoteSummaryCache, RemoteSummaryGenerator};

/// Thin reqwest wrapper for table reads, upserts and function calls
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```
/// use reprolab::backend::BackendClient;
/// use reprolab::config::BackendConfig;
///
/// let config = BackendConfig {
///     url: "https://project.example.co/".to_string(),
///     api_key: "anon-key".to_string(),
///     request_timeout_seconds: 30,
/// };
/// let client = BackendClient::new(&config).unwrap();
/// assert_eq!(client.base_url(), "https://project.example.co");
/// ```
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    /// Create a client from backend configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("reprolab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReprolabError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        tracing::debug!("Initialized backend client: url={}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Project URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn function_url(&self, function: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, function)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Read rows from `table` matching the PostgREST `query` parameters
    ///
    /// An empty result is `Ok(vec![])`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.table_url(table);
        tracing::debug!("Selecting from {}: {:?}", table, query);

        let response = self
            .authorized(self.client.get(&url))
            .query(query)
            .send()
            .await
            .map_err(ReprolabError::from)?;
        let response = check_status(response, table).await?;

        response.json::<Vec<T>>().await.map_err(|e| {
            tracing::error!("Failed to parse rows from {}: {}", table, e);
            ReprolabError::Http(e).into()
        })
    }

    /// Insert or merge `rows` into `table`, resolving conflicts on
    /// `on_conflict` columns
    pub async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &[T],
    ) -> Result<()> {
        let url = self.table_url(table);
        tracing::debug!("Upserting {} row(s) into {}", rows.len(), table);

        let response = self
            .authorized(self.client.post(&url))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(ReprolabError::from)?;
        check_status(response, table).await?;
        Ok(())
    }

    /// Invoke the function `name` with a JSON payload
    pub async fn invoke<P, R>(&self, name: &str, payload: &P) -> Result<R>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.function_url(name);
        tracing::debug!("Invoking function {}", name);

        let response = self
            .authorized(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .map_err(ReprolabError::from)?;
        let response = check_status(response, name).await?;

        response.json::<R>().await.map_err(|e| {
            tracing::error!("Failed to parse response of function {}: {}", name, e);
            ReprolabError::Http(e).into()
        })
    }
}

async fn check_status(response: Response, target: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::error!("Backend returned error {} for {}: {}", status, target, error_text);
    Err(ReprolabError::Backend {
        status: status.as_u16(),
        message: if error_text.is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_string()
        } else {
            error_text
        },
    }
    .into())
}
