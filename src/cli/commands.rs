use crate::app::{AppContext, RelayError, Result};
use crate::config::{Config, ConfigError};
use crate::daemon::{self, Daemon, DaemonConfig};

/// Run the scheduler until SIGINT/SIGTERM.
pub async fn run_daemon(
    ctx: &AppContext,
    interval: Option<&str>,
    no_initial_run: bool,
) -> Result<()> {
    let config = daemon_config(&ctx.config, interval, no_initial_run)?;
    let scheduler = Daemon::new(ctx.runner.clone(), config);
    daemon::listen_for_signals(scheduler.handle())?;
    scheduler.run().await;
    Ok(())
}

fn daemon_config(
    config: &Config,
    interval: Option<&str>,
    no_initial_run: bool,
) -> Result<DaemonConfig> {
    let interval_secs = match interval {
        Some(s) => DaemonConfig::parse_interval(s).map_err(ConfigError::Invalid)?,
        None => config.interval_secs()?,
    };
    if interval_secs == 0 {
        return Err(ConfigError::Invalid("interval must be greater than zero".into()).into());
    }

    Ok(DaemonConfig {
        interval_secs,
        run_on_start: config.run_on_start && !no_initial_run,
    })
}

pub async fn run_once(ctx: &AppContext) -> Result<()> {
    match ctx.runner.run_once().await {
        Ok(report) => {
            println!(
                "Run complete: {} published, {} already seen, {} source errors, {} publish errors",
                report.published, report.already_seen, report.source_errors, report.publish_errors
            );
            if report.destinations == 0 {
                println!("No destination has a webhook configured");
            }
            Ok(())
        }
        Err(RelayError::Persist { published, source }) => {
            eprintln!("Published {} items but could not save the ledger", published);
            Err(RelayError::Persist { published, source })
        }
        Err(e) => Err(e),
    }
}

pub async fn send_test(ctx: &AppContext, destination: &str) -> Result<()> {
    ctx.runner.send_test(destination).await?;
    println!("Sent test notification to {}", destination);
    Ok(())
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    let config = &ctx.config;
    println!(
        "Interval: {}",
        DaemonConfig::format_interval(config.interval_secs()?)
    );
    println!(
        "Ledger: {} ({} entries)",
        config.ledger_path()?.display(),
        ctx.runner.ledger_len().await
    );
    if let Some(days) = config.retention_days {
        println!("Retention: {} days", days);
    }

    if config.destinations.is_empty() {
        println!("No destinations");
        return Ok(());
    }

    for destination in &config.destinations {
        let webhook = if ctx.runner.resolves(&destination.name) {
            "webhook configured"
        } else {
            "no webhook, skipped"
        };
        println!("{} ({})", destination.name, webhook);
        for source in &destination.sources {
            println!("  {:<8} {:<8} {}", source.kind(), source.tag(), source.url());
        }
    }

    Ok(())
}
