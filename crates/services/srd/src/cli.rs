//! Command-line interface for the scriptrun daemon.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command-line interface for the scriptrun daemon.
#[derive(Parser, Debug)]
#[command(name = "srd")]
#[command(about = "scriptrun daemon - store, run and stop scripts over HTTP")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storage root (overrides the configuration file, falls back to SRD_STORAGE)
    #[arg(short, long)]
    pub storage: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    pub address: SocketAddr,
}
