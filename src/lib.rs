//! # feedrelay
//!
//! Polls heterogeneous content sources and relays each new item exactly once
//! to a Discord destination.
//!
//! ## Architecture
//!
//! ```text
//! Source (feed | listing | scrape) → Item → Fingerprint → Ledger → Publisher → Sink
//! ```
//!
//! Each run fetches every source concurrently, drops items whose fingerprint
//! is already in the ledger, publishes the rest one at a time and writes the
//! ledger back once at the end.
//!
//! ## Quick Start
//!
//! ```bash
//! # Poll every 20 minutes
//! NEWS_WEBHOOK_URL=https://discord.com/api/webhooks/... feedrelay daemon
//!
//! # Single run
//! feedrelay run
//!
//! # Check a webhook
//! feedrelay test news
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires the fetcher, sink,
/// ledger and pipeline together from the configuration.
pub mod app;

/// Command-line interface using clap.
///
/// - `daemon [--interval 20m] [--no-initial-run]` - Poll until stopped
/// - `run` - Run the pipeline once
/// - `test <destination>` - Send a test notification
/// - `status` - Show destinations and ledger size
pub mod cli;

/// Configuration loaded from `~/.config/feedrelay/config.toml`.
pub mod config;

/// Scheduler with readiness wait, run-now and signal handling.
pub mod daemon;

/// Core domain models.
///
/// - [`Item`](domain::Item): A normalized candidate notification
/// - [`Fingerprint`](domain::Fingerprint): Truncated SHA-256 identity of an item
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait returning raw bodies
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Persistent record of published fingerprints, stored as a JSON snapshot.
pub mod ledger;

/// One run over every destination.
pub mod pipeline;

/// Paced notification delivery and the Discord webhook sink.
pub mod publisher;

/// Source adapters: syndication feeds, JSON listings and HTML pages.
pub mod sources;

#[cfg(test)]
mod test_utils;
