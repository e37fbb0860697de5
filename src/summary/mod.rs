//! Daily summary cache-or-compute
//!
//! [`DailySummaryResolver`] returns today's summary for a client. It reads
//! the cached row for `(client_id, today)` first and only invokes the
//! remote generator on a miss, persisting the fresh text with an upsert.
//!
//! # Ordering
//!
//! The upsert is issued only after the generator call has succeeded. A
//! failed generation writes nothing and is returned to the caller as-is;
//! there is no retry and no fallback text.
//!
//! # Concurrency
//!
//! Two resolutions for the same key running at the same time may both miss,
//! both generate and both upsert. The storage layer's upsert-on-conflict
//! keeps exactly one row (last write wins). Generation is at-least-once.

use crate::config::LookupErrorPolicy;
use crate::error::{Result, ReprolabError};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

pub mod types;
pub use types::{
    DailySummary, DailySummaryCacheEntry, GeneratorPayload, GeneratorResponse, SummaryContext,
    SummaryKey, SummaryRequest,
};

/// Persisted summary cache keyed by `(client_id, summary_date)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryCache: Send + Sync {
    /// Look up the entry for `key`
    ///
    /// Returns `Ok(None)` when no row exists. Transport and storage
    /// failures are returned as errors.
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummaryCacheEntry>>;

    /// Insert or overwrite the unique entry for `key`
    async fn put(&self, key: &SummaryKey, entry: &DailySummaryCacheEntry) -> Result<()>;
}

/// Remote summary generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Generate a summary for `payload`
    ///
    /// Both transport failures and `success: false` replies are errors.
    async fn generate(&self, payload: &GeneratorPayload) -> Result<DailySummaryCacheEntry>;
}

/// Cache-or-compute resolver for daily summaries
///
/// # Examples
///
/// ```no_run
/// use reprolab::backend::{BackendClient, RemoteSummaryCache, RemoteSummaryGenerator};
/// use reprolab::config::Config;
/// use reprolab::summary::{DailySummaryResolver, SummaryRequest};
///
/// # async fn example() -> reprolab::error::Result<()> {
/// let config = Config::default();
/// let client = BackendClient::new(&config.backend)?;
/// let resolver = DailySummaryResolver::new(
///     RemoteSummaryCache::new(client.clone(), &config.summary.table),
///     RemoteSummaryGenerator::new(client, &config.summary.function),
/// );
///
/// let summary = resolver.resolve(&SummaryRequest::new("C1", "Fazenda Boa Vista")).await?;
/// println!("{} (cached: {})", summary.summary, summary.from_cache);
/// # Ok(())
/// # }
/// ```
pub struct DailySummaryResolver<C, G> {
    cache: C,
    generator: G,
    lookup_error_policy: LookupErrorPolicy,
}

impl<C, G> DailySummaryResolver<C, G>
where
    C: SummaryCache,
    G: SummaryGenerator,
{
    /// Create a resolver using the default lookup-error policy
    pub fn new(cache: C, generator: G) -> Self {
        Self {
            cache,
            generator,
            lookup_error_policy: LookupErrorPolicy::default(),
        }
    }

    /// Choose how a failed cache lookup is handled
    ///
    /// # Examples
    ///
    /// ```
    /// use reprolab::config::LookupErrorPolicy;
    /// use reprolab::summary::{DailySummaryResolver, SummaryCache, SummaryGenerator};
    ///
    /// fn strict<C: SummaryCache, G: SummaryGenerator>(
    ///     cache: C,
    ///     generator: G,
    /// ) -> DailySummaryResolver<C, G> {
    ///     DailySummaryResolver::new(cache, generator)
    ///         .with_lookup_error_policy(LookupErrorPolicy::Fail)
    /// }
    /// ```
    pub fn with_lookup_error_policy(mut self, policy: LookupErrorPolicy) -> Self {
        self.lookup_error_policy = policy;
        self
    }

    /// Policy applied when the cache lookup fails
    pub fn lookup_error_policy(&self) -> LookupErrorPolicy {
        self.lookup_error_policy
    }

    /// Resolve today's summary, with "today" taken from the local clock
    pub async fn resolve(&self, request: &SummaryRequest) -> Result<DailySummary> {
        self.resolve_at(request, Local::now()).await
    }

    /// Resolve the summary for the calendar day of `now`
    ///
    /// `now` is interpreted in its own time zone: its date is the cache key
    /// and its wall-clock time is forwarded to the generator.
    ///
    /// # Errors
    ///
    /// - `ReprolabError::InvalidInput` for an empty client id (no remote call)
    /// - generator errors, unchanged, with nothing written to the cache
    /// - upsert errors after a successful generation
    /// - lookup errors when the policy is [`LookupErrorPolicy::Fail`]
    pub async fn resolve_at<Tz>(
        &self,
        request: &SummaryRequest,
        now: DateTime<Tz>,
    ) -> Result<DailySummary>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        request.validate()?;

        let today = now.date_naive();
        let time = now.format("%H:%M").to_string();
        let key = SummaryKey::new(request.client_id.clone(), today);

        if let Some(entry) = self.lookup(&key).await? {
            tracing::debug!(
                "Daily summary cache hit: client={}, date={}",
                key.client_id,
                key.summary_date
            );
            return Ok(DailySummary::cached(entry));
        }

        tracing::info!(
            "Daily summary cache miss, generating: client={}, date={}",
            key.client_id,
            key.summary_date
        );

        let payload = GeneratorPayload {
            client_id: request.client_id.clone(),
            client_name: request.client_name.clone(),
            date: today.format("%Y-%m-%d").to_string(),
            time,
            context: request.context.clone(),
        };

        let entry = self.generator.generate(&payload).await?;
        self.cache.put(&key, &entry).await?;

        tracing::debug!(
            "Stored daily summary: client={}, date={}, generated_at={}",
            key.client_id,
            key.summary_date,
            entry.generated_at
        );

        Ok(DailySummary::generated(entry))
    }

    async fn lookup(&self, key: &SummaryKey) -> Result<Option<DailySummaryCacheEntry>> {
        match self.cache.get(key).await {
            Ok(found) => Ok(found),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => match self.lookup_error_policy {
                LookupErrorPolicy::Regenerate => {
                    tracing::warn!(
                        "Daily summary lookup failed for client={}, date={}; regenerating: {}",
                        key.client_id,
                        key.summary_date,
                        e
                    );
                    Ok(None)
                }
                LookupErrorPolicy::Fail => Err(e),
            },
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ReprolabError>()
        .map(ReprolabError::is_not_found)
        .unwrap_or(false)
}
