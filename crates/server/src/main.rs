mod bootstrap;
mod calendar;
mod chat_client;
mod health;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use fern_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(name = "fern-server", about = "Fern chat bot: tasks, calendar events and a daily digest")]
struct Args {
    #[arg(long, help = "Path to fern.toml (defaults to ./fern.toml or ./config/fern.toml)")]
    config: Option<PathBuf>,
}

fn init_logging(config: &AppConfig) {
    use fern_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Args::parse()).await
}

async fn run(args: Args) -> Result<()> {
    let options = LoadOptions {
        require_file: args.config.is_some(),
        config_path: args.config,
        ..LoadOptions::default()
    };
    let config = AppConfig::load(options)?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.state.clone(),
    )
    .await?;

    let digest = app.digest_runner.map(|runner| tokio::spawn(runner.run()));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_user = %app.bot_user.display_name,
        digest_enabled = digest.is_some(),
        "fern-server started"
    );
    app.socket_runner.start().await?;

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "fern-server stopping"
    );
    if let Some(digest) = digest {
        digest.abort();
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
