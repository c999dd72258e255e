//! One pass over every destination: fetch, dedup, publish, record.
//!
//! ```text
//! Source::fetch → Fingerprint → Ledger::seen? → Publisher → Ledger::mark
//!                                                    ... → Ledger::persist (once)
//! ```
//!
//! Fetches run concurrently; everything after them is sequential, so
//! per-destination ordering is preserved and the ledger is written once per
//! run. The ledger lock is held for the whole run, which serializes
//! overlapping callers (scheduler and manual triggers).

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::app::{RelayError, Result};
use crate::fetcher::Fetcher;
use crate::ledger::Ledger;
use crate::publisher::Publisher;
use crate::sources::Source;

const TEST_TITLE: &str = "✅ Test";
const TEST_DESCRIPTION: &str = "This is a test notification.";

/// A named sink together with the sources that feed it.
pub struct Destination {
    pub name: String,
    /// Static label attached to every message for this destination.
    pub footer: String,
    pub sources: Vec<Box<dyn Source>>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Newly published items.
    pub published: usize,
    pub already_seen: usize,
    pub source_errors: usize,
    pub publish_errors: usize,
    /// Destinations that were actually processed.
    pub destinations: usize,
    pub pruned: usize,
}

pub struct PipelineRunner {
    destinations: Vec<Destination>,
    fetcher: Arc<dyn Fetcher>,
    publisher: Publisher,
    ledger: Mutex<Ledger>,
    retention_secs: Option<i64>,
}

impl PipelineRunner {
    pub fn new(
        destinations: Vec<Destination>,
        fetcher: Arc<dyn Fetcher>,
        publisher: Publisher,
        ledger: Ledger,
    ) -> Self {
        Self {
            destinations,
            fetcher,
            publisher,
            ledger: Mutex::new(ledger),
            retention_secs: None,
        }
    }

    /// Forget ledger entries older than `days` at the start of each run.
    pub fn with_retention_days(mut self, days: Option<u64>) -> Self {
        self.retention_secs =
            days.map(|d| i64::try_from(d.saturating_mul(86_400)).unwrap_or(i64::MAX));
        self
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn resolves(&self, destination: &str) -> bool {
        self.publisher.resolves(destination)
    }

    pub async fn sink_ready(&self) -> Result<()> {
        self.publisher.ready().await
    }

    pub async fn ledger_len(&self) -> usize {
        self.ledger.lock().await.len()
    }

    /// Run the whole pipeline once.
    ///
    /// Source and publish failures are counted in the report and do not stop
    /// the run. Only a failed ledger write fails the run; the marks it
    /// would have written stay in memory for the next attempt.
    pub async fn run_once(&self) -> Result<RunReport> {
        let mut ledger = self.ledger.lock().await;
        let mut report = RunReport::default();

        if let Some(retention) = self.retention_secs {
            let cutoff = Utc::now().timestamp().saturating_sub(retention);
            report.pruned = ledger.prune_older_than(cutoff);
        }

        let active: Vec<&Destination> = self
            .destinations
            .iter()
            .filter(|d| {
                let runnable = !d.sources.is_empty() && self.publisher.resolves(&d.name);
                if !runnable {
                    debug!(destination = %d.name, "destination skipped: no sources or no sink");
                }
                runnable
            })
            .collect();
        report.destinations = active.len();

        let fetcher = self.fetcher.as_ref();
        let fetched = join_all(active.iter().map(|d| {
            join_all(d.sources.iter().map(|source| source.fetch(fetcher)))
        }))
        .await;

        for (destination, results) in active.iter().zip(fetched) {
            for (source, result) in destination.sources.iter().zip(results) {
                let items = match result {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(
                            destination = %destination.name,
                            source = source.tag(),
                            url = source.url(),
                            error = %e,
                            "source failed"
                        );
                        report.source_errors += 1;
                        continue;
                    }
                };

                let mut new_items = 0;
                for item in items {
                    let fingerprint = item.fingerprint();
                    if ledger.seen(&fingerprint) {
                        report.already_seen += 1;
                        continue;
                    }

                    let published = self
                        .publisher
                        .publish(
                            &destination.name,
                            &item.title,
                            &item.link,
                            &item.description,
                            &destination.footer,
                        )
                        .await;

                    match published {
                        Ok(()) => {
                            ledger.mark(fingerprint, Utc::now().timestamp());
                            report.published += 1;
                            new_items += 1;
                        }
                        Err(e) => {
                            warn!(
                                destination = %destination.name,
                                source = source.tag(),
                                title = item.display_title(),
                                error = %e,
                                "publish failed, item will be retried next run"
                            );
                            report.publish_errors += 1;
                        }
                    }
                }

                if new_items > 0 {
                    info!(
                        destination = %destination.name,
                        source = source.tag(),
                        new_items,
                        "published"
                    );
                }
            }
        }

        if let Err(source) = ledger.persist() {
            error!(path = %ledger.path().display(), error = %source, "ledger persist failed");
            return Err(RelayError::Persist {
                published: report.published,
                source,
            });
        }

        Ok(report)
    }

    /// Send a synthetic notification to `destination` without touching the
    /// ledger.
    pub async fn send_test(&self, destination: &str) -> Result<()> {
        let target = self
            .destinations
            .iter()
            .find(|d| d.name == destination && self.publisher.resolves(&d.name))
            .ok_or_else(|| RelayError::UnknownDestination(destination.to_string()))?;

        self.publisher
            .publish(&target.name, TEST_TITLE, "", TEST_DESCRIPTION, &target.footer)
            .await
    }
}
