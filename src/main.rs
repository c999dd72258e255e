use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedrelay::app::AppContext;
use feedrelay::cli::{commands, Cli, Commands};
use feedrelay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedrelay=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Daemon {
            interval,
            no_initial_run,
        } => {
            commands::run_daemon(&ctx, interval.as_deref(), no_initial_run).await?;
        }
        Commands::Run => {
            commands::run_once(&ctx).await?;
        }
        Commands::Test { destination } => {
            commands::send_test(&ctx, &destination).await?;
        }
        Commands::Status => {
            commands::status(&ctx).await?;
        }
    }

    Ok(())
}
