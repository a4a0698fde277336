//! `dashboard-notify` entry point.

mod cli;
mod commands;
mod prompt;

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dashboard_client::{HttpNotificationApi, NotificationApi};
use dashboard_common::{Config, FileTokenStore, MemoryTokenStore, TokenStore};

use crate::cli::{Cli, Command};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "dashboard=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn token_store(config: &Config) -> anyhow::Result<Arc<dyn TokenStore>> {
    Ok(match &config.auth.token_file {
        Some(path) => {
            debug!(path = %path.display(), "Using token file");
            Arc::new(FileTokenStore::open(path)?)
        }
        None => Arc::new(MemoryTokenStore::from_config(&config.auth)),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    init_tracing(config.logging.json);
    info!(base_url = %config.api.base_url, "Starting dashboard-notify");

    let api: Arc<dyn NotificationApi> =
        Arc::new(HttpNotificationApi::new(&config.api, token_store(&config)?)?);
    let sync = &config.sync;

    let filters = cli.command.filters();
    match cli.command {
        Command::List { page, .. } => {
            commands::list(api, sync, page, filters.unwrap_or_default()).await
        }
        Command::Watch => commands::watch(api, sync).await,
        Command::Read { id } => commands::read(api, sync, &id).await,
        Command::ReadAll => commands::read_all(api, sync).await,
        Command::Delete { ids, yes } => commands::delete(api, sync, &ids, yes).await,
        Command::Test => commands::test(api, sync).await,
    }
}
