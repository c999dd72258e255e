//! Source adapters.
//!
//! Each adapter turns one external format into [`Item`]s:
//!
//! ```text
//! Fetcher (bytes) → Source::parse → Vec<Item>
//! ```
//!
//! - [`FeedSource`]: RSS/Atom/JSON Feed documents via feed-rs
//! - [`ListingSource`]: JSON listing APIs
//! - [`ScrapeSource`]: anchors on an HTML page
//!
//! Which adapter runs is decided by [`SourceConfig`], never by inspecting
//! the fetched content.

pub mod feed;
pub mod listing;
pub mod scrape;

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use crate::app::Result;
use crate::domain::Item;
use crate::fetcher::Fetcher;

pub use feed::{FeedConfig, FeedSource};
pub use listing::{ListingConfig, ListingSource};
pub use scrape::{ScrapeConfig, ScrapeSource};

#[async_trait]
pub trait Source: Send + Sync {
    /// Short tag qualifying every fingerprint this source produces.
    fn tag(&self) -> &str;

    fn url(&self) -> &str;

    /// Fetch and parse one poll's worth of candidate items, in source order.
    async fn fetch(&self, fetcher: &dyn Fetcher) -> Result<Vec<Item>>;
}

/// Configuration of one adapter bound to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Feed(FeedConfig),
    Listing(ListingConfig),
    Scrape(ScrapeConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Feed(_) => "feed",
            SourceConfig::Listing(_) => "listing",
            SourceConfig::Scrape(_) => "scrape",
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            SourceConfig::Feed(c) => &c.tag,
            SourceConfig::Listing(c) => &c.tag,
            SourceConfig::Scrape(c) => &c.tag,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            SourceConfig::Feed(c) => &c.url,
            SourceConfig::Listing(c) => &c.url,
            SourceConfig::Scrape(c) => &c.url,
        }
    }

    pub fn build(&self) -> Box<dyn Source> {
        match self {
            SourceConfig::Feed(c) => Box::new(FeedSource::new(c.clone())),
            SourceConfig::Listing(c) => Box::new(ListingSource::new(c.clone())),
            SourceConfig::Scrape(c) => Box::new(ScrapeSource::new(c.clone())),
        }
    }
}

/// Prefix a title, substituting `fallback` when the natural title is blank.
pub(crate) fn headline(prefix: &str, title: &str, fallback: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { fallback } else { title };
    format!("{prefix}{title}")
}

/// Reduce an HTML snippet to its text with whitespace collapsed.
pub(crate) fn plain_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let words: Vec<&str> = fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect();
    words.join(" ")
}
