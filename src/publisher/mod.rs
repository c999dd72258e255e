//! Outbound notifications.
//!
//! [`Publisher`] bounds and timestamps each message and spaces successive
//! sends by a fixed delay; a [`Sink`] performs the actual delivery.

pub mod discord;
pub mod message;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::app::Result;

pub use discord::DiscordWebhookSink;
pub use message::Notification;

pub const DEFAULT_PUBLISH_DELAY: Duration = Duration::from_millis(700);

/// A named downstream messaging target.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Whether messages for `destination` can be delivered at all.
    fn resolves(&self, destination: &str) -> bool;

    /// Succeeds once the sink can accept messages.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, destination: &str, message: &Notification) -> Result<()>;
}

pub struct Publisher {
    sink: Arc<dyn Sink>,
    delay: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl Publisher {
    pub fn new(sink: Arc<dyn Sink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            last_send: Mutex::new(None),
        }
    }

    pub fn resolves(&self, destination: &str) -> bool {
        self.sink.resolves(destination)
    }

    pub async fn ready(&self) -> Result<()> {
        self.sink.ready().await
    }

    /// Format and send one notification, waiting out the inter-send delay
    /// first if the previous send was too recent.
    pub async fn publish(
        &self,
        destination: &str,
        title: &str,
        link: &str,
        description: &str,
        footer: &str,
    ) -> Result<()> {
        let mut last_send = self.last_send.lock().await;
        if let Some(previous) = *last_send {
            sleep_until(previous + self.delay).await;
        }

        let message = Notification::new(title, link, description, footer, Utc::now());
        let result = self.sink.send(destination, &message).await;
        *last_send = Some(Instant::now());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    #[tokio::test(start_paused = true)]
    async fn test_successive_publishes_are_spaced() {
        let sink = Arc::new(RecordingSink::new(["news"]));
        let publisher = Publisher::new(sink.clone(), DEFAULT_PUBLISH_DELAY);

        let start = Instant::now();
        for i in 0..3 {
            publisher
                .publish("news", &format!("Item {i}"), "", "", "footer")
                .await
                .unwrap();
        }

        assert_eq!(sink.sent().len(), 3);
        assert!(start.elapsed() >= DEFAULT_PUBLISH_DELAY * 2);
        assert!(start.elapsed() < DEFAULT_PUBLISH_DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_publish_is_immediate() {
        let sink = Arc::new(RecordingSink::new(["news"]));
        let publisher = Publisher::new(sink.clone(), DEFAULT_PUBLISH_DELAY);

        let start = Instant::now();
        publisher.publish("news", "Only", "", "", "footer").await.unwrap();
        assert!(start.elapsed() < DEFAULT_PUBLISH_DELAY);
    }

    #[tokio::test]
    async fn test_publish_formats_message() {
        let sink = Arc::new(RecordingSink::new(["game"]));
        let publisher = Publisher::new(sink.clone(), Duration::ZERO);

        publisher
            .publish(
                "game",
                &"t".repeat(300),
                "https://www.fut.gg/news/a",
                "body",
                "AIFinity Hub • FUT News",
            )
            .await
            .unwrap();

        let sent = sink.sent();
        let (destination, message) = &sent[0];
        assert_eq!(destination, "game");
        assert_eq!(message.title.chars().count(), message::MAX_TITLE_CHARS);
        assert_eq!(message.url.as_deref(), Some("https://www.fut.gg/news/a"));
        assert_eq!(message.footer, "AIFinity Hub • FUT News");
    }

    #[tokio::test]
    async fn test_sink_rejection_is_returned() {
        let sink = Arc::new(RecordingSink::new(["news"]).rejecting("Broken"));
        let publisher = Publisher::new(sink.clone(), Duration::ZERO);

        assert!(publisher.publish("news", "Broken", "", "", "f").await.is_err());
        assert!(publisher.publish("news", "Fine", "", "", "f").await.is_ok());
        assert_eq!(sink.sent().len(), 1);
    }
}
