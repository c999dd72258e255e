use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::app::{RelayError, Result};
use crate::publisher::{Notification, Sink};

/// Discord "blurple".
const EMBED_COLOR: u32 = 0x5865F2;
const MAX_ATTEMPTS: u8 = 3;
const MAX_RETRY_AFTER_SECS: f64 = 60.0;

/// Delivers notifications as embeds through Discord webhooks, one webhook
/// URL per destination.
#[derive(Clone)]
pub struct DiscordWebhookSink {
    client: Client,
    webhooks: HashMap<String, String>,
}

impl DiscordWebhookSink {
    pub fn new(client: Client, webhooks: HashMap<String, String>) -> Self {
        Self { client, webhooks }
    }

    fn webhook(&self, destination: &str) -> Result<&str> {
        self.webhooks
            .get(destination)
            .map(String::as_str)
            .ok_or_else(|| RelayError::UnknownDestination(destination.to_string()))
    }
}

#[async_trait]
impl Sink for DiscordWebhookSink {
    fn resolves(&self, destination: &str) -> bool {
        self.webhooks.contains_key(destination)
    }

    async fn ready(&self) -> Result<()> {
        for (destination, url) in &self.webhooks {
            let response = self.client.get(url).send().await?;
            if let Err(e) = response.error_for_status_ref() {
                return Err(RelayError::sink(destination, e));
            }
        }
        Ok(())
    }

    async fn send(&self, destination: &str, message: &Notification) -> Result<()> {
        let url = self.webhook(destination)?;
        let payload = WebhookPayload::from(message);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| RelayError::sink(destination, e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt >= MAX_ATTEMPTS {
                return Err(RelayError::sink(destination, format!("HTTP {status}")));
            }

            let wait = retry_after(&response)
                .unwrap_or_else(|| Duration::from_millis(500u64 << (attempt - 1)));
            tracing::debug!(destination, %status, attempt, ?wait, "webhook send retry");
            tokio::time::sleep(wait).await;
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    parse_retry_after(response.headers().get(RETRY_AFTER)?.to_str().ok()?)
}

/// `Retry-After` in (possibly fractional) seconds, capped.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER_SECS)))
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    description: String,
    timestamp: String,
    color: u32,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

impl From<&Notification> for WebhookPayload {
    fn from(message: &Notification) -> Self {
        Self {
            embeds: vec![Embed {
                title: message.title.clone(),
                url: message.url.clone(),
                description: message.description.clone(),
                timestamp: message.timestamp.to_rfc3339(),
                color: EMBED_COLOR,
                footer: EmbedFooter {
                    text: message.footer.clone(),
                },
            }],
        }
    }
}
