//! Configuration management for Reprolab
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, ReprolabError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Reprolab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection settings
    pub backend: BackendConfig,
    /// Daily summary cache and generator settings
    #[serde(default)]
    pub summary: SummaryConfig,
    /// Embryo-analysis job polling settings
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Hosted backend configuration
///
/// The backend exposes REST tables under `rest/v1/` and invocable
/// functions under `functions/v1/` of the same base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the project, e.g. `https://project.example.co`
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// API key sent as `apikey` and as the bearer token
    #[serde(default)]
    pub api_key: String,

    /// Per-request transport timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: String::new(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Daily summary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Table holding one cached summary per (client_id, summary_date)
    #[serde(default = "default_summary_table")]
    pub table: String,

    /// Name of the remote generator function
    #[serde(default = "default_summary_function")]
    pub function: String,

    /// What to do when the cache lookup itself fails
    #[serde(default)]
    pub lookup_error_policy: LookupErrorPolicy,
}

fn default_summary_table() -> String {
    "daily_summaries".to_string()
}

fn default_summary_function() -> String {
    "daily-summary".to_string()
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            table: default_summary_table(),
            function: default_summary_function(),
            lookup_error_policy: LookupErrorPolicy::default(),
        }
    }
}

/// Handling of storage errors raised by the cache lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupErrorPolicy {
    /// Treat the error as a cache miss and generate a fresh summary
    #[default]
    Regenerate,
    /// Propagate the storage error to the caller
    Fail,
}

impl std::str::FromStr for LookupErrorPolicy {
    type Err = ReprolabError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regenerate" => Ok(LookupErrorPolicy::Regenerate),
            "fail" => Ok(LookupErrorPolicy::Fail),
            other => Err(ReprolabError::Config(format!(
                "Invalid lookup error policy: {}. Must be one of: regenerate, fail",
                other
            ))),
        }
    }
}

/// Job polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Queue table the analysis worker updates
    #[serde(default = "default_job_table")]
    pub table: String,

    /// Interval between status fetches while the job is not terminal (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_job_table() -> String {
    "embryo_analysis_queue".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            table: default_job_table(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

const MIN_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 600_000;

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReprolabError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ReprolabError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("REPROLAB_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(api_key) = std::env::var("REPROLAB_API_KEY") {
            self.backend.api_key = api_key;
        }

        if let Ok(timeout) = std::env::var("REPROLAB_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid REPROLAB_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(table) = std::env::var("REPROLAB_SUMMARY_TABLE") {
            self.summary.table = table;
        }

        if let Ok(function) = std::env::var("REPROLAB_SUMMARY_FUNCTION") {
            self.summary.function = function;
        }

        if let Ok(policy) = std::env::var("REPROLAB_LOOKUP_ERROR_POLICY") {
            match policy.parse() {
                Ok(value) => self.summary.lookup_error_policy = value,
                Err(e) => tracing::warn!("{}", e),
            }
        }

        if let Ok(table) = std::env::var("REPROLAB_JOB_TABLE") {
            self.jobs.table = table;
        }

        if let Ok(interval) = std::env::var("REPROLAB_POLL_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.jobs.poll_interval_ms = value;
            } else {
                tracing::warn!("Invalid REPROLAB_POLL_INTERVAL_MS: {}", interval);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ReprolabError::Config` naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.url).map_err(|e| {
            ReprolabError::Config(format!("Invalid backend.url {}: {}", self.backend.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReprolabError::Config(format!(
                "backend.url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.backend.api_key.trim().is_empty() {
            return Err(ReprolabError::Config(
                "backend.api_key cannot be empty (set REPROLAB_API_KEY)".to_string(),
            )
            .into());
        }

        if self.backend.request_timeout_seconds == 0 {
            return Err(ReprolabError::Config(
                "backend.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.summary.table.trim().is_empty() {
            return Err(
                ReprolabError::Config("summary.table cannot be empty".to_string()).into(),
            );
        }

        if self.summary.function.trim().is_empty() {
            return Err(
                ReprolabError::Config("summary.function cannot be empty".to_string()).into(),
            );
        }

        if self.jobs.table.trim().is_empty() {
            return Err(ReprolabError::Config("jobs.table cannot be empty".to_string()).into());
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.jobs.poll_interval_ms) {
            return Err(ReprolabError::Config(format!(
                "jobs.poll_interval_ms must be between {} and {}",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS
            ))
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            summary: SummaryConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}
