//! scriptrun daemon (srd)
//!
//! Serves the script store and the run manager over a small JSON API:
//!
//! - **Scripts**: list, create, read and update stored scripts
//! - **Runs**: run a script to completion, stop it, poll its log
//!
//! Ctrl-C stops every live run before the server exits.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use sr_config::{RunnerConfig, UserConfig};
use sr_runner::RunManager;
use sr_store::ScriptStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::{AppState, router},
    cli::Cli,
    prelude::*,
};

mod api;
mod cli;
mod error;
mod prelude;

const STORAGE_ENV: &str = "SRD_STORAGE";

/// ```bash
/// srd --storage ~/scripts-workspace --address 127.0.0.1:3000
/// SRD_STORAGE=~/scripts-workspace srd --config srd.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,sr_runner=info,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let store = match &config.storage_root {
        Some(root) => Some(Arc::new(ScriptStore::open(root)?)),
        None => {
            warn!("No storage root configured, scripts cannot be stored or run");
            None
        }
    };
    let state = AppState {
        store,
        runs: Arc::new(RunManager::new(config)),
    };

    let listener = tokio::net::TcpListener::bind(cli.address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state.runs))
        .await?;

    info!("Server stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RunnerConfig> {
    let user_config = match &cli.config {
        Some(path) => UserConfig::from_file(path)?,
        None => UserConfig::default(),
    };
    let mut config = RunnerConfig::from_user_config(user_config);

    let storage_root = cli
        .storage
        .clone()
        .or(config.storage_root.take())
        .or_else(|| std::env::var_os(STORAGE_ENV).map(PathBuf::from));
    if let Some(root) = storage_root {
        config = config.with_storage_root(root);
    }
    Ok(config)
}

async fn shutdown_signal(runs: Arc<RunManager>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
    let stopped = runs.stop_all();
    if stopped > 0 {
        info!("Stopped {stopped} running script(s)");
    }
}
