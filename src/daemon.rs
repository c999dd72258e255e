//! Long-running scheduler.
//!
//! Waits for the sink to become ready, then runs the pipeline on a fixed
//! cadence until stopped. Extra runs can be started with
//! [`DaemonHandle::run_now`] or `SIGUSR1`; the runner's ledger lock keeps
//! them from overlapping with scheduled ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::app::Result;
use crate::pipeline::PipelineRunner;

const READY_BACKOFF_START: Duration = Duration::from_secs(5);
const READY_BACKOFF_MAX: Duration = Duration::from_secs(300);

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Pause between the end of one run and the start of the next, in seconds
    pub interval_secs: u64,
    /// Whether to run once as soon as the sink is ready
    pub run_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20 * 60,
            run_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "30s", "20m", "1h", "1d" or raw seconds
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();
        let (digits, unit_secs, unit) = match s.char_indices().last() {
            Some((i, 'd')) => (&s[..i], 86_400, "days"),
            Some((i, 'h')) => (&s[..i], 3_600, "hours"),
            Some((i, 'm')) => (&s[..i], 60, "minutes"),
            Some((i, 's')) => (&s[..i], 1, "seconds"),
            _ => {
                return s.parse::<u64>().map_err(|_| {
                    format!("Invalid interval: {}. Use format like '30s', '20m', '1h', '1d'", s)
                })
            }
        };

        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(unit_secs))
            .ok_or_else(|| format!("Invalid {}: {}", unit, digits))
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

/// Controls a running [`Daemon`] from another task.
#[derive(Clone)]
pub struct DaemonHandle {
    runner: Arc<PipelineRunner>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl DaemonHandle {
    /// Start a run in its own task, independent of the schedule.
    pub fn run_now(&self) -> JoinHandle<()> {
        let runner = self.runner.clone();
        tokio::spawn(async move { run_cycle(&runner, "manual").await })
    }

    /// Stop after the current scheduled run, if any.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

/// Daemon runner
pub struct Daemon {
    runner: Arc<PipelineRunner>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Daemon {
    pub fn new(runner: Arc<PipelineRunner>, config: DaemonConfig) -> Self {
        Self {
            runner,
            config,
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            runner: self.runner.clone(),
            running: self.running.clone(),
            wake: self.wake.clone(),
        }
    }

    /// Run until stopped.
    pub async fn run(&self) {
        info!(
            interval = %DaemonConfig::format_interval(self.config.interval_secs),
            destinations = self.runner.destinations().len(),
            pid = std::process::id(),
            "daemon started"
        );

        if !self.wait_until_ready().await {
            info!("daemon stopped before the sink became ready");
            return;
        }

        if self.config.run_on_start {
            run_cycle(&self.runner, "initial").await;
        }

        let interval = Duration::from_secs(self.config.interval_secs);
        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = sleep(interval) => {}
                _ = self.wake.notified() => {}
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            run_cycle(&self.runner, "scheduled").await;
        }

        info!("daemon shutting down");
    }

    /// Probe the sink until it answers, backing off between attempts.
    /// Returns false if the daemon was stopped first.
    async fn wait_until_ready(&self) -> bool {
        let mut backoff = READY_BACKOFF_START;
        while self.running.load(Ordering::SeqCst) {
            match self.runner.sink_ready().await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(error = %e, retry_in = ?backoff, "sink not ready");
                    tokio::select! {
                        _ = sleep(backoff) => {}
                        _ = self.wake.notified() => {}
                    }
                    backoff = (backoff * 2).min(READY_BACKOFF_MAX);
                }
            }
        }
        false
    }
}

async fn run_cycle(runner: &PipelineRunner, trigger: &'static str) {
    let start = Instant::now();
    match runner.run_once().await {
        Ok(report) => info!(
            trigger,
            published = report.published,
            already_seen = report.already_seen,
            source_errors = report.source_errors,
            publish_errors = report.publish_errors,
            pruned = report.pruned,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run complete"
        ),
        Err(e) => error!(trigger, error = %e, "run failed"),
    }
}

/// Stop on SIGINT/SIGTERM and run early on SIGUSR1.
#[cfg(unix)]
pub fn listen_for_signals(handle: DaemonHandle) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    handle.stop();
                    break;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received");
                    handle.stop();
                    break;
                }
                _ = sigusr1.recv() => {
                    info!("SIGUSR1 received, running now");
                    drop(handle.run_now());
                }
            }
        }
    });
    Ok(())
}

/// Stop on Ctrl-C.
#[cfg(not(unix))]
pub fn listen_for_signals(handle: DaemonHandle) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            handle.stop();
        }
    });
    Ok(())
}
