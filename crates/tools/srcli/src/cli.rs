//! Command-line interface for srcli.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "srcli")]
#[command(about = "scriptrun CLI - resolve and run scripts, read run logs")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the command line a script would be run with
    Resolve {
        /// Script file
        file: PathBuf,
    },
    /// Run a script once and mirror its exit code
    Run {
        /// Script file
        file: PathBuf,

        /// Script id used for the run log (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,

        /// Storage root holding the run logs
        #[arg(short, long)]
        storage: Option<PathBuf>,

        /// Print the run result as JSON instead of the raw output
        #[arg(long)]
        json: bool,
    },
    /// Print the current log of a script
    Log {
        /// Script id
        id: String,

        /// Storage root holding the run logs
        #[arg(short, long)]
        storage: Option<PathBuf>,
    },
}
