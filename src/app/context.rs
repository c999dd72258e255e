use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::ledger::Ledger;
use crate::pipeline::{Destination, PipelineRunner};
use crate::publisher::{DiscordWebhookSink, Publisher};
use crate::sources::SourceConfig;

/// Everything a command needs, wired from the loaded configuration.
pub struct AppContext {
    pub config: Config,
    pub runner: Arc<PipelineRunner>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.user_agent, timeout)?);

        let mut webhooks = HashMap::new();
        let mut destinations = Vec::with_capacity(config.destinations.len());
        for destination in &config.destinations {
            match destination.webhook() {
                Some(url) => {
                    webhooks.insert(destination.name.clone(), url);
                }
                None => tracing::warn!(
                    destination = %destination.name,
                    "no webhook configured, destination will be skipped"
                ),
            }

            destinations.push(Destination {
                name: destination.name.clone(),
                footer: destination.footer.clone(),
                sources: destination.sources.iter().map(SourceConfig::build).collect(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        let sink = Arc::new(DiscordWebhookSink::new(client, webhooks));
        let publisher = Publisher::new(sink, Duration::from_millis(config.publish_delay_ms));

        let ledger = Ledger::load(config.ledger_path()?);
        let runner = PipelineRunner::new(destinations, fetcher, publisher, ledger)
            .with_retention_days(config.retention_days);

        Ok(Self {
            config,
            runner: Arc::new(runner),
        })
    }
}
