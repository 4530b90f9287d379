//! Palaver CLI entry point.

use anyhow::Result;
use clap::Parser;
use palaver::cli::{commands, Cli, Commands};
use palaver::config::{Credentials, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("palaver={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let credentials = Credentials::from_env();

    // Execute command
    match &cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            let host = host.clone().unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            let static_dir = match static_dir {
                Some(dir) => Settings::expand_path(dir),
                None => settings.static_dir(),
            };
            commands::run_serve(&host, port, static_dir, settings, credentials).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings, credentials).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &credentials)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
