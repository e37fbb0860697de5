//! Reprolab - reproduction management client CLI
//!
#![doc = "Main entry point for the Reprolab command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reprolab::cli::{Cli, Commands, JobCommand};
use reprolab::commands;
use reprolab::config::Config;
use reprolab::jobs::format_elapsed;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Pure formatting needs no backend
    if let Commands::Elapsed { seconds } = &cli.command {
        println!("{}", format_elapsed(*seconds));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.config, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Summary {
            client,
            name,
            context,
            json,
        } => {
            tracing::info!("Resolving daily summary for client {}", client);
            commands::summary::run_summary(&config, client, name, context.as_deref(), json)
                .await?;
            Ok(())
        }
        Commands::Job { command } => match command {
            JobCommand::Watch { id } => {
                commands::job::watch_job(&config, id).await?;
                Ok(())
            }
            JobCommand::Status { id, json } => {
                commands::job::show_job_status(&config, id, json).await?;
                Ok(())
            }
        },
        Commands::Elapsed { .. } => Ok(()),
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "reprolab=debug"
    } else {
        "reprolab=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
