use async_trait::async_trait;
use feed_rs::parser;
use html_escape::decode_html_entities;
use serde::Deserialize;

use crate::app::{RelayError, Result};
use crate::domain::{suffixed_seed, Item};
use crate::fetcher::Fetcher;
use crate::sources::{headline, plain_text, Source};

pub const DEFAULT_FEED_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub tag: String,
    pub url: String,
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
    DEFAULT_FEED_LIMIT
}

/// Syndication feed adapter (RSS 0.9x/1.0/2.0, Atom, JSON Feed).
pub struct FeedSource {
    config: FeedConfig,
}

impl FeedSource {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    pub fn parse(&self, body: &[u8]) -> Result<Vec<Item>> {
        // Entries without an id keep an empty one so the link/title fallback applies.
        let feed = parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .build()
            .parse(body)
            .map_err(|e| RelayError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .take(self.config.limit)
            .map(|entry| {
                let title = entry
                    .title
                    .map(|t| decode_html_entities(&t.content).to_string())
                    .unwrap_or_default();
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();

                // id, then link, then title
                let key = [entry.id.as_str(), link.as_str(), title.as_str()]
                    .into_iter()
                    .find(|k| !k.is_empty())
                    .unwrap_or_default()
                    .to_string();

                let description = entry
                    .summary
                    .map(|s| s.content)
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|s| plain_text(&s))
                    .unwrap_or_default();

                let mut item = Item::new(&self.config.tag, suffixed_seed(&key, &self.config.tag));
                item.title =
                    headline(&self.config.title_prefix, &title, &self.config.fallback_title);
                item.link = link;
                item.description = description;
                item
            })
            .collect();

        Ok(items)
    }
}

#[async_trait]
impl Source for FeedSource {
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
