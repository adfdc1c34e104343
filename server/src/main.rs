//! Gateway entrypoint
//!
//! Wires configuration, the provider registry, the SQLite store and the
//! dispatch use case together, then serves the HTTP API.

mod routes;
mod server;

use anyhow::Result;
use clap::Parser;
use polyask_application::{DispatchPolicy, DispatchQueryUseCase};
use polyask_infrastructure::{ConfigLoader, SqliteHistoryStore, build_providers};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyask", about = "Multi-provider chat fanout gateway")]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config file
    #[arg(long)]
    bind: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting polyask");

    let config = ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?;

    let store = Arc::new(SqliteHistoryStore::open(&config.history.db_path).await?);

    let providers = build_providers(&config)?;
    if providers.is_empty() {
        warn!("No providers configured, chat requests will fail until credentials are supplied");
    }

    let mut policy = DispatchPolicy::default();
    policy.provider_timeout = Duration::from_secs(config.dispatch.provider_timeout_secs);
    if let Some(suffix) = config.dispatch.reply_brief_suffix.clone() {
        policy.reply_brief_suffix = suffix;
    }

    let dispatch = DispatchQueryUseCase::new(providers, store.clone(), policy);

    let state = AppState {
        dispatch: Arc::new(dispatch),
        history: store.clone(),
        accounts: store,
    };

    let bind = cli.bind.unwrap_or(config.server.bind);
    server::run(state, &bind).await
}
