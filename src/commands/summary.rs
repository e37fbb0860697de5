//! `reprolab summary` handler

use crate::backend::{BackendClient, RemoteSummaryCache, RemoteSummaryGenerator};
use crate::config::Config;
use crate::error::{Result, ReprolabError};
use crate::summary::{DailySummary, DailySummaryResolver, SummaryContext, SummaryRequest};
use colored::Colorize;
use std::path::Path;

/// Resolve and print today's summary for `client_id`
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `client_id` - Client identifier
/// * `client_name` - Name forwarded to the generator; defaults to `client_id`
/// * `context_path` - Optional JSON file holding the context bundle
/// * `json` - Print the result as JSON instead of text
pub async fn run_summary(
    config: &Config,
    client_id: String,
    client_name: Option<String>,
    context_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let context = match context_path {
        Some(path) => load_context(path)?,
        None => SummaryContext::default(),
    };
    let client_name = client_name.unwrap_or_else(|| client_id.clone());
    let request = SummaryRequest::new(client_id, client_name).with_context(context);

    let backend = BackendClient::new(&config.backend)?;
    let resolver = DailySummaryResolver::new(
        RemoteSummaryCache::new(backend.clone(), &config.summary.table),
        RemoteSummaryGenerator::new(backend, &config.summary.function),
    )
    .with_lookup_error_policy(config.summary.lookup_error_policy);

    let summary = resolver.resolve(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Read a context bundle from a JSON file
pub fn load_context(path: &Path) -> Result<SummaryContext> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ReprolabError::InvalidInput(format!(
            "Failed to read context file {}: {}",
            path.display(),
            e
        ))
    })?;
    let context = serde_json::from_str(&contents).map_err(ReprolabError::from)?;
    Ok(context)
}

fn print_summary(summary: &DailySummary) {
    let origin = if summary.from_cache {
        "cached".dimmed()
    } else {
        "new".green()
    };
    println!(
        "[{}] generated {}",
        origin,
        summary.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
    println!("{}", summary.summary);
}
