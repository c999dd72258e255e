use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::app::Result;
use crate::domain::{prefixed_seed, Item};
use crate::fetcher::Fetcher;
use crate::sources::{headline, plain_text, Source};

pub const DEFAULT_LISTING_LIMIT: usize = 5;

/// A JSON API returning newest-first records, e.g.
/// `{"items": [{"id": 1, "name": "...", "description": "..."}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingConfig {
    pub tag: String,
    pub url: String,
    /// Link for a record; `{id}` is replaced by the record id.
    pub link_template: String,
    #[serde(default)]
    pub title_prefix: String,
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_items_field")]
    pub items_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_title_field")]
    pub title_field: String,
    #[serde(default = "default_description_field")]
    pub description_field: String,
}

fn default_fallback_title() -> String {
    "Untitled".to_string()
}

fn default_limit() -> usize {
    DEFAULT_LISTING_LIMIT
}

fn default_items_field() -> String {
    "items".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_title_field() -> String {
    "name".to_string()
}

fn default_description_field() -> String {
    "description".to_string()
}

pub struct ListingSource {
    config: ListingConfig,
}

impl ListingSource {
    pub fn new(config: ListingConfig) -> Self {
        Self { config }
    }

    pub fn parse(&self, body: &[u8]) -> Result<Vec<Item>> {
        let document: Value = serde_json::from_slice(body)?;
        let records = document
            .get(self.config.items_field.as_str())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut items = Vec::with_capacity(records.len().min(self.config.limit));
        for record in records.iter().take(self.config.limit) {
            let Some(id) = record.get(self.config.id_field.as_str()).and_then(scalar_text) else {
                tracing::debug!(source = %self.config.tag, "listing record without id skipped");
                continue;
            };

            let title = record
                .get(self.config.title_field.as_str())
                .and_then(Value::as_str)
                .unwrap_or_default();
            let description = record
                .get(self.config.description_field.as_str())
                .and_then(Value::as_str)
                .map(plain_text)
                .unwrap_or_default();

            let mut item = Item::new(&self.config.tag, prefixed_seed(&self.config.tag, &id));
            item.title = headline(&self.config.title_prefix, title, &self.config.fallback_title);
            item.link = self.config.link_template.replace("{id}", &id);
            item.description = description;
            items.push(item);
        }

        Ok(items)
    }
}

/// Ids come as strings or numbers depending on the API.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Source for ListingSource {
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
