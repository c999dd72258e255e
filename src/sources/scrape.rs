use std::collections::HashSet;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::app::{RelayError, Result};
use crate::domain::{prefixed_seed, Item};
use crate::fetcher::Fetcher;
use crate::sources::{headline, Source};

pub const DEFAULT_SCRAPE_LIMIT: usize = 8;

const ANCHOR_SELECTOR: &str = "a[href]";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScrapeConfig {
    pub tag: String,
    pub url: String,
    /// Only anchors whose raw `href` starts with this are considered.
    pub href_prefix: String,
    #[serde(default)]
    pub title_prefix: String,
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_fallback_title() -> String {
    "News".to_string()
}

fn default_limit() -> usize {
    DEFAULT_SCRAPE_LIMIT
}

/// Extracts article links from a listing page.
pub struct ScrapeSource {
    config: ScrapeConfig,
}

impl ScrapeSource {
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }

    pub fn parse(&self, body: &[u8]) -> Result<Vec<Item>> {
        let base = Url::parse(&self.config.url)?;
        let selector = Selector::parse(ANCHOR_SELECTOR).map_err(|e| RelayError::Selector {
            selector: ANCHOR_SELECTOR.to_string(),
            message: format!("{e:?}"),
        })?;

        let page = String::from_utf8_lossy(body);
        let document = Html::parse_document(&page);

        let anchors = document
            .select(&selector)
            .filter(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| href.starts_with(&self.config.href_prefix))
            })
            .take(self.config.limit);

        let mut seen_hrefs = HashSet::new();
        let mut items = Vec::new();

        for anchor in anchors {
            let href = anchor.value().attr("href").unwrap_or_default();
            if href.is_empty() || !seen_hrefs.insert(href) {
                continue;
            }

            let link = match base.join(href) {
                Ok(link) => link.to_string(),
                Err(e) => {
                    tracing::debug!(
                        source = %self.config.tag,
                        href,
                        error = %e,
                        "unresolvable href"
                    );
                    continue;
                }
            };

            let text = anchor
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            let mut item = Item::new(&self.config.tag, prefixed_seed(&self.config.tag, href));
            item.title = headline(&self.config.title_prefix, &text, &self.config.fallback_title);
            item.link = link;
            items.push(item);
        }

        Ok(items)
    }
}

#[async_trait]
impl Source for ScrapeSource {
    fn tag(&self) -> &str {
        &self.config.tag
    }

    fn url(&self) -> &str {
        &self.config.url
    }

    async fn fetch(&self, fetcher: &dyn Fetcher) -> Result<Vec<Item>> {
        let body = fetcher.fetch(&self.config.url).await?;
        self.parse(&body)
    }
}
