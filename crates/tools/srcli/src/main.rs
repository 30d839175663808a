//! scriptrun command-line tool (srcli)
//!
//! ```bash
//! srcli resolve ./report.py
//! srcli run ./report.py --storage ~/scripts-workspace
//! srcli log report --storage ~/scripts-workspace
//! ```

mod cli;
mod commands;
mod error;
mod prelude;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{handle_log, handle_resolve, handle_run, load_config};
use crate::prelude::*;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "srcli=warn,sr_runner=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Resolve { file } => handle_resolve(&file).map(|()| ExitCode::SUCCESS),
        Commands::Run {
            file,
            id,
            storage,
            json,
        } => handle_run(config, &file, id, storage, json).await,
        Commands::Log { id, storage } => {
            handle_log(config, &id, storage).await.map(|()| ExitCode::SUCCESS)
        }
    };

    if let Err(ref e) = result {
        tracing::error!("Error: {}", e);
    }

    result
}
