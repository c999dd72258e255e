pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedrelay")]
#[command(about = "Relay new feed, API and web page items to Discord", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedrelay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll and publish on a fixed interval until stopped
    Daemon {
        /// Pause between runs (e.g., "20m", "1h"); overrides the config file
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the run on start
        #[arg(long)]
        no_initial_run: bool,
    },
    /// Run the pipeline once and exit
    Run,
    /// Send a test notification to a destination
    Test {
        /// Destination name
        destination: String,
    },
    /// Show configuration and ledger status
    Status,
}
